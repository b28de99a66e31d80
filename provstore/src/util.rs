//! Basic utility functionality supporting provisioner management

pub mod duration;
pub mod error;
pub mod file_utils;
pub mod list_utils;

pub use crate::{
    util::duration::*, util::error::*, util::file_utils::*, util::list_utils::*,
};
