use crate::access::{FieldDescriptor, Reflect};
use crate::buffer::{Buffer, CandidatePool};
use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

/// A reference-sized atomic slot holding a `&'p Buffer`.
///
/// Only `&'p Buffer` values are ever stored, and `'p` is invariant, so every
/// pointer loaded back out is valid for `'p`.
pub struct Slot<'p> {
    ptr: AtomicPtr<Buffer>,
    _marker: PhantomData<fn(&'p Buffer) -> &'p Buffer>,
}

impl<'p> Slot<'p> {
    fn new(initial: &'p Buffer) -> Self {
        Self {
            ptr: AtomicPtr::new(as_mut_ptr(initial)),
            _marker: PhantomData,
        }
    }

    pub fn load(&self, order: Ordering) -> &'p Buffer {
        // SAFETY: see the type-level invariant.
        unsafe { &*self.ptr.load(order) }
    }

    pub fn store(&self, value: &'p Buffer, order: Ordering) {
        self.ptr.store(as_mut_ptr(value), order);
    }

    /// Single indivisible compare-and-set on the stored reference.
    pub fn compare_and_set(
        &self,
        expected: &'p Buffer,
        new: &'p Buffer,
        success: Ordering,
        failure: Ordering,
    ) -> bool {
        self.ptr
            .compare_exchange(as_mut_ptr(expected), as_mut_ptr(new), success, failure)
            .is_ok()
    }
}

fn as_mut_ptr(buffer: &Buffer) -> *mut Buffer {
    ptr::from_ref(buffer).cast_mut()
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot")
            .field(&self.ptr.load(Ordering::Relaxed))
            .finish()
    }
}

/// The shared state every worker of a trial races on.
///
/// `current` always refers to a buffer of `pool`. Writes of foreign buffers
/// are caught by a debug assertion.
pub struct SharedCell<'p> {
    current: Slot<'p>,
    pool: &'p CandidatePool,
}

fn project_current<'a, 'p>(cell: &'a SharedCell<'p>) -> &'a Slot<'p> {
    &cell.current
}

pub(crate) static FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor {
        name: "current",
        type_name: "Buffer",
        type_id: TypeId::of::<Buffer>,
        writable: true,
        project: Some(project_current),
    },
    FieldDescriptor {
        name: "pool",
        type_name: "CandidatePool",
        type_id: TypeId::of::<CandidatePool>,
        writable: false,
        project: None,
    },
];

impl<'p> SharedCell<'p> {
    pub const TYPE_NAME: &'static str = "SharedCell";

    /// A fresh cell holding the pool's initial candidate.
    pub fn new(pool: &'p CandidatePool) -> Self {
        Self {
            current: Slot::new(pool.initial()),
            pool,
        }
    }

    pub fn read(&self) -> &'p Buffer {
        self.current.load(Ordering::Acquire)
    }

    pub fn write(&self, value: &'p Buffer) {
        debug_assert!(self.pool.contains(value), "buffer is not a pool candidate");
        self.current.store(value, Ordering::Release);
    }

    pub fn pool(&self) -> &'p CandidatePool {
        self.pool
    }
}

impl<'p> Reflect<'p> for SharedCell<'p> {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn fields(&self) -> &'static [FieldDescriptor] {
        &FIELDS
    }

    fn slot(&self, field: &FieldDescriptor) -> Option<&Slot<'p>> {
        field.project.map(|project| project(self))
    }
}

impl fmt::Debug for SharedCell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCell")
            .field("current", &self.pool.index_of(self.read()))
            .field("pool_size", &self.pool.len())
            .finish()
    }
}
