//! Client for the hosting platform's user-identity store.
//!
//! The store itself is owned by the platform; this crate only performs
//! point reads against it to resolve the anonymous identifier a course
//! user should be known by in the CRM (see [`resolver`]).

pub mod client;
pub mod resolver;

pub use client::{HttpIdentityStore, IdentityError, IdentityStore, StaticIdentityStore};
pub use resolver::{COMPAT_COURSE_SUFFIX, compat_course_key, resolve_anonymous_id};
