pub mod authors;
pub mod books;
pub mod external;
pub mod users;

use bookshelf_kernel::ModuleRegistry;

use crate::state::AppState;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, state: &AppState) -> anyhow::Result<()> {
    registry.register(authors::create_module(state.clone()))?;
    registry.register(books::create_module(state.clone()))?;
    registry.register(external::create_module(state.clone()))?;
    registry.register(users::create_module(state.clone()))?;
    Ok(())
}
