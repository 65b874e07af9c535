//! Name-bound access to the fields of [`SharedCell`].
//!
//! Both access paths resolve a field by name once, at setup, from the same
//! descriptor table:
//!
//! * [`FieldAccessor`] keeps the descriptor and goes through `&dyn Reflect`
//!   on every call, re-checking the receiver and the field's writability.
//! * [`AtomicHandle`] keeps only the resolved projection and offers atomic
//!   `get`, `set` and `compare_and_set` with no per-call checks.

mod field;
mod handle;

pub use self::field::{FieldAccessor, Reflect};
pub use self::handle::AtomicHandle;

use crate::cell::{self, SharedCell, Slot};
use crate::error::SetupError;
use std::any::TypeId;
use std::fmt;

/// Projects a cell onto one of its atomic slots.
pub type Projection = for<'a, 'p> fn(&'a SharedCell<'p>) -> &'a Slot<'p>;

/// Static description of one field of [`SharedCell`].
#[derive(Clone, Copy)]
pub struct FieldDescriptor {
    pub(crate) name: &'static str,
    pub(crate) type_name: &'static str,
    pub(crate) type_id: fn() -> TypeId,
    pub(crate) writable: bool,
    pub(crate) project: Option<Projection>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn holds<T: 'static>(&self) -> bool {
        (self.type_id)() == TypeId::of::<T>()
    }

    fn expect<T: 'static>(&self, expected: &'static str) -> Result<(), SetupError> {
        if self.holds::<T>() {
            Ok(())
        } else {
            Err(SetupError::TypeMismatch {
                field: self.name,
                expected,
                actual: self.type_name,
            })
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("writable", &self.writable)
            .field("atomic", &self.project.is_some())
            .finish()
    }
}

/// Resolves `name` in the [`SharedCell`] descriptor table.
pub fn lookup(name: &str) -> Result<&'static FieldDescriptor, SetupError> {
    cell::FIELDS
        .iter()
        .find(|field| field.name == name)
        .ok_or_else(|| SetupError::NoSuchField {
            owner: SharedCell::TYPE_NAME,
            name: name.to_owned(),
        })
}
