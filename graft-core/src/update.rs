use crate::param::Param;

/// Registry of trainable parameters handed to optimizers.
///
/// Parameter sets register each of their trainable matrices exactly once
/// in [`ParameterSet::export_trainables`](crate::ParameterSet::export_trainables).
/// Since the registry holds mutable borrows, the same [Param] can not be
/// registered twice.
#[derive(Debug, Default)]
pub struct Trainables<'a> {
    names: Vec<String>,
    params: Vec<&'a mut Param>,
}

impl<'a> Trainables<'a> {
    /// Empty registry
    #[must_use]
    pub const fn new() -> Self {
        Trainables {
            names: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Register param under name
    pub fn register(&mut self, name: impl Into<String>, param: &'a mut Param) {
        self.names.push(name.into());
        self.params.push(param);
    }

    /// Number of registered params
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Is nothing registered?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Params in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.params.iter().map(|p| &**p))
    }

    /// Params in registration order, mutably
    pub fn iter_mut(&mut self) -> TrainablesIterMut<'_, 'a> {
        TrainablesIterMut {
            inner: self.names.iter().zip(self.params.iter_mut()),
        }
    }
}

/// Mutable iterator over registered params, see [Trainables::iter_mut]
#[derive(Debug)]
pub struct TrainablesIterMut<'s, 'a> {
    inner: core::iter::Zip<core::slice::Iter<'s, String>, core::slice::IterMut<'s, &'a mut Param>>,
}

impl<'s> Iterator for TrainablesIterMut<'s, '_> {
    type Item = (&'s str, &'s mut Param);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(name, param)| (name.as_str(), &mut **param))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for TrainablesIterMut<'_, '_> {}

/// Joins registration prefix and field name
pub(crate) fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.into()
    } else {
        format!("{prefix}.{name}")
    }
}
