#![deny(unsafe_code, missing_docs, non_snake_case)]
#![warn(dead_code, unused_results, unreachable_pub)]

//! Uniform bucket grid over world-space positions.
//!
//! The index is cleared and refilled every tick. Bucket storage is retained
//! between rebuilds so steady-state ticks do not allocate. Queries return every
//! item whose bucket overlaps the query circle; callers filter by squared
//! distance themselves.

use glam::Vec2;

/// Default bucket edge length in world units.
///
/// Chosen larger than every radius the simulation queries with so a query
/// touches at most four buckets.
pub const DEFAULT_BUCKET_SIZE: f32 = 8.0;

/// Dense bucket grid storing copies of `T` keyed by position.
#[derive(Clone, Debug)]
pub struct SpatialIndex<T> {
    bucket_size: f32,
    columns: usize,
    rows: usize,
    buckets: Vec<Vec<(T, Vec2)>>,
    len: usize,
}

impl<T: Copy> SpatialIndex<T> {
    /// Creates an index covering `width` by `height` world units.
    ///
    /// Non-positive or non-finite bucket sizes fall back to
    /// [`DEFAULT_BUCKET_SIZE`].
    #[must_use]
    pub fn new(width: f32, height: f32, bucket_size: f32) -> Self {
        let bucket_size = if bucket_size.is_finite() && bucket_size > 0.0 {
            bucket_size
        } else {
            DEFAULT_BUCKET_SIZE
        };
        let columns = bucket_span(width, bucket_size);
        let rows = bucket_span(height, bucket_size);

        Self {
            bucket_size,
            columns,
            rows,
            buckets: (0..columns * rows).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    /// Edge length of a bucket.
    #[must_use]
    pub fn bucket_size(&self) -> f32 {
        self.bucket_size
    }

    /// Number of items currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Reports whether the index holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every item while keeping bucket allocations.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    /// Inserts an item at the provided position.
    ///
    /// Positions outside the covered area are clamped into the border buckets.
    pub fn insert(&mut self, item: T, position: Vec2) {
        let column = self.clamp_column(position.x);
        let row = self.clamp_row(position.y);
        let index = row * self.columns + column;
        self.buckets[index].push((item, position));
        self.len += 1;
    }

    /// Appends to `out` every item in buckets intersecting the circle.
    ///
    /// The result may contain items farther than `radius`; it never misses an
    /// item within it.
    pub fn query(&self, center: Vec2, radius: f32, out: &mut Vec<T>) {
        self.visit(center, radius, |item, _| out.push(item));
    }

    /// Appends to `out` every item within `radius`, filtered by squared
    /// distance, together with its indexed position.
    pub fn query_within(&self, center: Vec2, radius: f32, out: &mut Vec<(T, Vec2)>) {
        let radius_squared = radius * radius;
        self.visit(center, radius, |item, position| {
            if position.distance_squared(center) <= radius_squared {
                out.push((item, position));
            }
        });
    }

    fn visit(&self, center: Vec2, radius: f32, mut visitor: impl FnMut(T, Vec2)) {
        if self.buckets.is_empty() || !radius.is_finite() || radius < 0.0 {
            return;
        }

        let first_column = self.clamp_column(center.x - radius);
        let last_column = self.clamp_column(center.x + radius);
        let first_row = self.clamp_row(center.y - radius);
        let last_row = self.clamp_row(center.y + radius);
        let radius_squared = radius * radius;

        for row in first_row..=last_row {
            for column in first_column..=last_column {
                if self.bucket_distance_squared(column, row, center) > radius_squared {
                    continue;
                }
                for &(item, position) in &self.buckets[row * self.columns + column] {
                    visitor(item, position);
                }
            }
        }
    }

    fn bucket_distance_squared(&self, column: usize, row: usize, point: Vec2) -> f32 {
        let min = Vec2::new(column as f32, row as f32) * self.bucket_size;
        let max = min + Vec2::splat(self.bucket_size);
        let nearest = point.clamp(min, max);
        nearest.distance_squared(point)
    }

    fn clamp_column(&self, x: f32) -> usize {
        clamp_bucket(x, self.bucket_size, self.columns)
    }

    fn clamp_row(&self, y: f32) -> usize {
        clamp_bucket(y, self.bucket_size, self.rows)
    }
}

fn bucket_span(extent: f32, bucket_size: f32) -> usize {
    if !extent.is_finite() || extent <= 0.0 {
        return 1;
    }
    ((extent / bucket_size).ceil() as usize).max(1)
}

fn clamp_bucket(coordinate: f32, bucket_size: f32, count: usize) -> usize {
    if !coordinate.is_finite() || coordinate <= 0.0 {
        return 0;
    }
    ((coordinate / bucket_size) as usize).min(count.saturating_sub(1))
}
