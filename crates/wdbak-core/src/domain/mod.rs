//! Domain layer: configuration model for the backup client.
//!
//! Everything here is deterministic and side-effect free.  Parsing the same
//! [`FormState`](form::FormState) twice always yields equal records, and
//! validation may be repeated as often as the caller likes.

pub mod form;
pub mod record;
pub mod validation;
