use std::collections::BTreeSet;

/// Zbiór zaznaczonych kodów. Jedyne mutatory to `toggle` i `clear`;
/// iteracja zawsze w porządku rosnącym kodów.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    codes: BTreeSet<String>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dodaje kod, jeśli go nie ma, w przeciwnym razie usuwa.
    /// Zwraca `true`, gdy kod jest po operacji zaznaczony.
    pub fn toggle(&mut self, code: &str) -> bool {
        if self.codes.remove(code) {
            false
        } else {
            self.codes.insert(code.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.codes.clear();
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn sorted(&self) -> Vec<String> {
        self.codes.iter().cloned().collect()
    }
}
