//! A compact one-to-many table: the values for key `k` are `table[index[k]..index[k + 1]]`.
//! Keys are dense and are created in order.

#[derive(Clone, Debug)]
pub struct RampTable<T> {
    pub index: Vec<usize>,
    pub table: Vec<T>,
}

impl<T> RampTable<T> {
    pub fn new() -> Self {
        Self {
            index: vec![0],
            table: Vec::new(),
        }
    }

    pub fn num_keys(&self) -> usize {
        self.index.len() - 1
    }

    pub fn num_values(&self) -> usize {
        self.table.len()
    }

    #[cfg(test)]
    pub fn values<Q: Into<usize>>(&self, key: Q) -> &[T] {
        let key: usize = key.into();
        &self.table[self.index[key]..self.index[key + 1]]
    }

    /// Iterates &[T], one for each key in the table.
    pub fn iter_values(&self) -> impl Iterator<Item = &[T]> {
        self.index.windows(2).map(move |w| &self.table[w[0]..w[1]])
    }

    /// Use like this:
    ///
    ///   rt.push_value(...);
    ///   rt.push_value(...);
    ///   rt.finish_key();
    #[cfg(test)]
    pub fn push_value(&mut self, value: T) {
        self.table.push(value);
    }

    pub fn finish_key(&mut self) {
        let end = self.table.len();
        self.index.push(end);
    }

    pub fn push_entry(&mut self, iter: impl Iterator<Item = T>) {
        self.table.extend(iter);
        self.finish_key();
    }
}
