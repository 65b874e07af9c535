use crate::access::{lookup, FieldDescriptor};
use crate::buffer::Buffer;
use crate::cell::{SharedCell, Slot};
use crate::error::{AccessError, SetupError};
use std::sync::atomic::Ordering;

/// Runtime view of an object's fields.
pub trait Reflect<'p> {
    fn type_name(&self) -> &'static str;

    fn fields(&self) -> &'static [FieldDescriptor];

    /// The slot behind `field`, if it is slot-backed on this receiver.
    fn slot(&self, field: &FieldDescriptor) -> Option<&Slot<'p>>;
}

/// A field bound by name, read and written through dynamic dispatch.
///
/// Binding only checks that the name exists. Whether the field can actually
/// be read or written as a buffer is checked on every call, and a violation
/// is reported to the caller of that attempt.
#[derive(Debug, Clone, Copy)]
pub struct FieldAccessor {
    owner: &'static str,
    field: &'static FieldDescriptor,
}

impl FieldAccessor {
    pub fn bind(name: &str) -> Result<Self, SetupError> {
        Ok(Self {
            owner: SharedCell::TYPE_NAME,
            field: lookup(name)?,
        })
    }

    pub fn get<'p>(&self, target: &dyn Reflect<'p>) -> Result<&'p Buffer, AccessError> {
        Ok(self.resolve(target)?.load(Ordering::Acquire))
    }

    pub fn set<'p>(&self, target: &dyn Reflect<'p>, value: &'p Buffer) -> Result<(), AccessError> {
        if !self.field.writable {
            return Err(AccessError::ReadOnly {
                field: self.field.name,
            });
        }
        self.resolve(target)?.store(value, Ordering::Release);
        Ok(())
    }

    fn resolve<'t, 'p>(&self, target: &'t dyn Reflect<'p>) -> Result<&'t Slot<'p>, AccessError> {
        let actual = target.type_name();
        if actual != self.owner {
            return Err(AccessError::WrongReceiver {
                field: self.field.name,
                expected: self.owner,
                actual,
            });
        }
        target.slot(self.field).ok_or(AccessError::Inaccessible {
            owner: actual,
            field: self.field.name,
        })
    }
}
