//! the test_utils folder here will share utils or test components between
//! unit tests
mod common;
mod mock;

pub(crate) use common::*;
pub(crate) use mock::*;
