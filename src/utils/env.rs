// src/utils/env.rs
use log::debug;

/// Loads a `.env` file from the working directory if one exists.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(_) => debug!("No .env file found, using process environment only"),
    }
}
