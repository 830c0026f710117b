//! Server Module
//!
//! Everything needed to turn the sync engine into a running Axum server.
//!
//! # Architecture
//!
//! - **`state`** - Application state structure and `FromRef` implementations
//! - **`config`** - Configuration loading (env, `.env`, TOML file)
//! - **`init`** - Router creation and background task startup
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - load_config
//! └── init.rs         - create_app and BackgroundTasks
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use boardsync::backend::server::{create_app, load_config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config()?;
//! let addr = config.socket_addr()?;
//! let (app, tasks) = create_app(config);
//! let listener = tokio::net::TcpListener::bind(addr).await?;
//! axum::serve(listener, app).await?;
//! tasks.shutdown().await;
//! # Ok(())
//! # }
//! ```

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::load_config;
pub use init::{create_app, create_app_with_state, spawn_background, BackgroundTasks};
pub use state::{AppState, SessionInit};
