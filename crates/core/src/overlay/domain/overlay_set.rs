use crate::overlay::domain::overlay_shape::OverlayShape;

/// The shapes currently on screen.
///
/// Replace-on-update: the only mutations are wholesale replacement and
/// clearing, so a set never mixes shapes from two detection batches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlaySet {
    shapes: Vec<OverlayShape>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every current shape and installs `shapes` in their place.
    /// Returns how many shapes were removed.
    pub fn replace(&mut self, shapes: Vec<OverlayShape>) -> usize {
        std::mem::replace(&mut self.shapes, shapes).len()
    }

    /// Removes every shape. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        self.replace(Vec::new())
    }

    pub fn shapes(&self) -> &[OverlayShape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OverlayShape> {
        self.shapes.iter()
    }
}

impl<'a> IntoIterator for &'a OverlaySet {
    type Item = &'a OverlayShape;
    type IntoIter = std::slice::Iter<'a, OverlayShape>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
