//! Column accessors and their registry.
//!
//! A row type opts in by implementing [`RowShape`], usually through the
//! [`row_shape!`](crate::row_shape) macro, which binds column names to fields
//! at compile time. Dynamic rows (JSON objects, string-keyed maps) look fields
//! up by name at call time.
//!
//! The registry memoizes the ordered accessor list per (row shape, column
//! names). Two threads resolving the same key at once may both build a list;
//! the first insert wins and both callers get the stored one.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use gridstream_core::schema::ColumnSchema;
pub use gridstream_core::value::{ToValue, Value};

/// Extraction function for one column of one row type.
pub struct Accessor<R: ?Sized> {
    get: Arc<dyn Fn(&R) -> Value + Send + Sync>,
    bound: bool,
}

impl<R: ?Sized> Accessor<R> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&R) -> Value + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(f),
            bound: true,
        }
    }

    /// Accessor for a column the row type does not have. Always `Null`.
    pub fn missing() -> Self
    where
        R: 'static,
    {
        Self {
            get: Arc::new(|_: &R| Value::Null),
            bound: false,
        }
    }

    pub fn get(&self, row: &R) -> Value {
        (self.get)(row)
    }

    /// `false` for accessors produced by [`Accessor::missing`].
    pub fn is_bound(&self) -> bool {
        self.bound
    }
}

impl<R: ?Sized> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            bound: self.bound,
        }
    }
}

impl<R: ?Sized> fmt::Debug for Accessor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

/// Identity of a row type in cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    type_id: TypeId,
    name: &'static str,
}

impl ShapeKey {
    pub fn of<R: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            name: std::any::type_name::<R>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A row type whose columns can be extracted by name.
pub trait RowShape: 'static {
    /// Bind `column` to a field, or `None` if the row has no such field.
    fn accessor(column: &str) -> Option<Accessor<Self>>;

    fn shape_key() -> ShapeKey {
        ShapeKey::of::<Self>()
    }
}

/// Implement [`RowShape`] for a struct by listing the fields that may be
/// exported. Each field must implement [`ToValue`].
///
/// ```
/// use gridstream_cells::row_shape;
///
/// struct Doc {
///     id: u64,
///     title: String,
///     archived: bool,
/// }
///
/// row_shape!(Doc { id, title, archived });
/// ```
#[macro_export]
macro_rules! row_shape {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::accessor::RowShape for $ty {
            fn accessor(
                column: &str,
            ) -> ::core::option::Option<$crate::accessor::Accessor<Self>> {
                match column {
                    $(
                        stringify!($field) => ::core::option::Option::Some(
                            $crate::accessor::Accessor::new(|row: &$ty| {
                                $crate::accessor::ToValue::to_value(&row.$field)
                            }),
                        ),
                    )+
                    _ => ::core::option::Option::None,
                }
            }
        }
    };
}

impl RowShape for serde_json::Map<String, serde_json::Value> {
    fn accessor(column: &str) -> Option<Accessor<Self>> {
        let key = column.to_owned();
        Some(Accessor::new(move |row: &Self| {
            row.get(&key).map(Value::from_json).unwrap_or(Value::Null)
        }))
    }
}

impl RowShape for BTreeMap<String, Value> {
    fn accessor(column: &str) -> Option<Accessor<Self>> {
        let key = column.to_owned();
        Some(Accessor::new(move |row: &Self| {
            row.get(&key).cloned().unwrap_or(Value::Null)
        }))
    }
}

impl RowShape for HashMap<String, Value> {
    fn accessor(column: &str) -> Option<Accessor<Self>> {
        let key = column.to_owned();
        Some(Accessor::new(move |row: &Self| {
            row.get(&key).cloned().unwrap_or(Value::Null)
        }))
    }
}

type CacheKey = (ShapeKey, Vec<String>);
type Resolved = Arc<dyn Any + Send + Sync>;

static SHARED: Lazy<Arc<AccessorRegistry>> = Lazy::new(|| Arc::new(AccessorRegistry::new()));

/// Memoized accessor lists keyed by (row shape, ordered column names).
#[derive(Default)]
pub struct AccessorRegistry {
    entries: RwLock<HashMap<CacheKey, Resolved>>,
    resolutions: AtomicUsize,
}

impl AccessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry for callers that do not manage their own.
    pub fn shared() -> Arc<AccessorRegistry> {
        Arc::clone(&SHARED)
    }

    /// Accessors for `schema` in column order. Missing fields resolve to
    /// [`Accessor::missing`].
    pub fn resolve<R: RowShape>(&self, schema: &ColumnSchema) -> Arc<Vec<Accessor<R>>> {
        let key: CacheKey = (R::shape_key(), schema.names().map(str::to_owned).collect());

        if let Some(hit) = self.lookup::<R>(&key) {
            return hit;
        }

        let built: Arc<Vec<Accessor<R>>> = Arc::new(
            schema
                .names()
                .map(|name| R::accessor(name).unwrap_or_else(Accessor::missing))
                .collect(),
        );
        self.resolutions.fetch_add(1, Ordering::Relaxed);

        // A poisoned lock only means another resolver panicked mid-insert;
        // entries are immutable once stored, so the map is still consistent.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let stored = entries
            .entry(key)
            .or_insert_with(|| Arc::clone(&built) as Resolved);
        Arc::clone(stored)
            .downcast::<Vec<Accessor<R>>>()
            .unwrap_or(built)
    }

    fn lookup<R: RowShape>(&self, key: &CacheKey) -> Option<Arc<Vec<Accessor<R>>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .and_then(|hit| Arc::clone(hit).downcast::<Vec<Accessor<R>>>().ok())
    }

    /// Number of accessor lists built so far (cache misses, including
    /// duplicate concurrent builds).
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for AccessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorRegistry")
            .field("entries", &self.len())
            .field("resolutions", &self.resolutions())
            .finish()
    }
}
