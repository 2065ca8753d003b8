//! Interval overlap predicates for envelope testing. Latitudes use the
//! plain linear test; longitudes wrap at the antimeridian and need the
//! cyclic variant.

/// Whether ordered intervals `[a1, a2]` and `[b1, b2]` overlap.
///
/// Touching endpoints do not count as overlap, with one exception: two
/// intervals sharing their left edge overlap whenever both have non-zero
/// width.
pub fn range_overlaps(a1: f64, a2: f64, b1: f64, b2: f64) -> bool {
    assert!(
        a1 <= a2 && b1 <= b2,
        "ranges don't make sense: {} {} {} {}",
        a1,
        a2,
        b1,
        b2
    );
    if b1 < a1 {
        // `b` starts to the left of `a`, so they intersect if `b` finishes
        // to the right of where `a` starts.
        return b2 > a1;
    }
    if a1 < b1 {
        return a2 > b1;
    }
    // Same left edge, so they must intersect unless one of them is zero-width.
    b2 != b1 && a2 != a1
}

/// Overlap of two longitude intervals on the 360-degree cycle. An interval
/// with `left > right` crosses the antimeridian: [170, -170] means
/// [170, 190].
pub fn cyclic_range_overlaps(a1: f64, mut a2: f64, b1: f64, mut b2: f64) -> bool {
    if a1 > a2 {
        a2 += 360.0;
    }
    if b1 > b2 {
        b2 += 360.0;
    }
    if range_overlaps(a1, a2, b1, b2) {
        return true;
    }
    // Not obviously overlapping, but they might be once the interval with
    // the smaller left edge is lifted a full turn: [-170, -160] against
    // [160, 210] is really [190, 200] against [160, 210].
    if a1 < b1 {
        range_overlaps(a1 + 360.0, a2 + 360.0, b1, b2)
    } else {
        range_overlaps(a1, a2, b1 + 360.0, b2 + 360.0)
    }
}
