#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod admin;
pub mod config;
pub mod provisioner;
pub mod roots;
pub mod selector;
pub mod store;
pub mod util;

// order of pub use statements below is intended to assure the list emitted by cargo doc on the main
// index.html page is in alphabetical order.
pub use crate::admin::*;
pub use crate::config::*;
pub use crate::provisioner::*;
pub use crate::roots::*;
pub use crate::selector::*;
pub use crate::store::*;
pub use crate::util::*;
