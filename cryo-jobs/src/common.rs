#![allow(unused)]

pub use star_util::common_io as io;

pub use clap::{Args, Parser, Subcommand};
pub use env_logger;

pub use log::{info, warn};
pub use std::path::Path;

pub use rayon::prelude::*;
