use micr_core::geometry::{degree_delta, Rect};
use micr_core::parser;

#[test]
fn parses_a_typical_micr_line_end_to_end() {
    let parsed = parser::parse("T123456780T987654321U0000123456U");
    assert_eq!(parsed.routing_number, "123456780");
    assert_eq!(parsed.account_number, "987654321");
}

#[test]
fn legacy_remap_only_triggers_on_literal_c() {
    let without_c = parser::parse("T1T2U3");
    let with_mapping_source = parser::parse("C1C2U3");
    // "C1C2U3" remaps to "U1U2U3": the digit runs all attach to the
    // first control's branch, unlike "T1T2U3"'s T-then-T-then-U shape.
    assert_ne!(without_c.routing_number, with_mapping_source.routing_number);
}

#[test]
fn rect_union_contains_both_inputs() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(20, 20, 5, 5);
    let u = a.union(&b);
    assert!(u.contains_rect(&a));
    assert!(u.contains_rect(&b));
}

#[test]
fn rect_intersection_is_none_when_disjoint() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(100, 100, 5, 5);
    assert!(a.intersection(&b).is_none());
}

#[test]
fn degree_delta_of_identical_angles_is_zero() {
    assert_eq!(degree_delta(42.0, 42.0), 0.0);
}
