pub mod auth;
pub mod config;
pub mod database;
pub mod handlers;
pub mod kernel;
pub mod router;

use std::sync::Arc;

use crate::{config::Config, kernel::JudiciaKernel};

#[derive(Clone)]
pub struct KernelState {
    pub kernel: Arc<JudiciaKernel>,
    pub config: Arc<Config>,
}
