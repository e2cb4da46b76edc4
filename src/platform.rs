// mipow Source Code File
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The `platform` module contains the native implementation of the [`api`](crate::api)
//! traits. Refer to the `api` module for how to use them.

pub use crate::native::{adapter::Adapter, connection::Connection};

use crate::api;
use static_assertions::assert_impl_all;
use std::fmt::Debug;

// Ensure that the exported types implement all the expected traits.
assert_impl_all!(Adapter: api::Central, Clone, Debug, Send, Sized, Sync);
assert_impl_all!(Connection: api::Connection, Clone, Debug, Send, Sized, Sync);
