use nalgebra::{Isometry3, Point3};

/// Triangle mesh produced by the solid builders.
///
/// Faces index into `vertices` (0-based). Appending never merges shared
/// vertices: a union is a plain concatenation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangulatedSurface {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
}

impl TriangulatedSurface {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Appends `other`, shifting its face indices past the current vertices.
    pub fn append(&mut self, other: &TriangulatedSurface) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );
    }

    pub fn transformed(mut self, iso: &Isometry3<f64>) -> Self {
        for v in self.vertices.iter_mut() {
            *v = iso * *v;
        }
        self
    }

    /// Axis-aligned bounds as (min, max), `None` for a surface without vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        let bounds = self.vertices.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        });
        Some(bounds)
    }

    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self
            .vertices
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / self.vertices.len() as f64))
    }

    /// Every face references existing, pairwise distinct vertices.
    pub fn has_valid_faces(&self) -> bool {
        let n = self.vertices.len();
        self.faces
            .iter()
            .all(|&[a, b, c]| a < n && b < n && c < n && a != b && b != c && a != c)
    }

    /// Sum of triangle areas.
    pub fn area(&self) -> f64 {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let e1 = self.vertices[b] - self.vertices[a];
                let e2 = self.vertices[c] - self.vertices[a];
                0.5 * e1.cross(&e2).norm()
            })
            .sum()
    }
}
