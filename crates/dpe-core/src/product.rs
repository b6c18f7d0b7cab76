//! Lazy Cartesian product over a list of domains.

/// Iterator over the Cartesian product of several slices.
///
/// Tuples are produced in nested-loop order, the last domain varying
/// fastest. An empty list of domains, or any empty domain, yields nothing.
#[derive(Debug, Clone)]
pub struct Product<'a, T> {
    domains: Vec<&'a [T]>,
    indices: Vec<usize>,
    done: bool,
}

/// Creates the product of `domains`
pub fn product<'a, T>(domains: impl IntoIterator<Item = &'a [T]>) -> Product<'a, T> {
    let domains: Vec<&'a [T]> = domains.into_iter().collect();
    let done = domains.is_empty() || domains.iter().any(|d| d.is_empty());
    Product {
        indices: vec![0; domains.len()],
        domains,
        done,
    }
}

impl<'a, T> Product<'a, T> {
    /// Number of tuples not produced yet
    fn remaining(&self) -> usize {
        if self.done {
            return 0;
        }
        let consumed = self
            .domains
            .iter()
            .zip(&self.indices)
            .fold(0, |acc, (domain, &i)| acc * domain.len() + i);
        self.domains.iter().map(|d| d.len()).product::<usize>() - consumed
    }

    fn advance(&mut self) {
        for i in (0..self.indices.len()).rev() {
            self.indices[i] += 1;
            if self.indices[i] < self.domains[i].len() {
                return;
            }
            self.indices[i] = 0;
        }
        self.done = true;
    }
}

impl<'a, T> Iterator for Product<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self
            .domains
            .iter()
            .zip(&self.indices)
            .map(|(domain, &i)| &domain[i])
            .collect();
        self.advance();
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Product<'_, T> {}
