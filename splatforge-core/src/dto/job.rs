//! Job DTOs for service boundaries

use serde::{Deserialize, Serialize};

/// Request to create a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Location of the uploaded source media, relative to the shared data
    /// root.
    pub input_path: String,
}
