use proptest::num::f32::NORMAL;
use proptest::prelude::*;
use proptest::strategy::Strategy;
use talus_geom::{Quat, Vec3};

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}
fn vapprox(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx(a.x, b.x, eps) && approx(a.y, b.y, eps) && approx(a.z, b.z, eps)
}

fn bounded_f32() -> impl Strategy<Value = f32> {
    NORMAL.prop_filter("bounded", |v| v.is_finite() && v.abs() <= 1e6)
}

fn bounded_nonzero_f32() -> impl Strategy<Value = f32> {
    NORMAL.prop_filter("bounded_nonzero", |v| {
        v.is_finite() && {
            let a = v.abs();
            (1e-3..=1e3).contains(&a)
        }
    })
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (bounded_f32(), bounded_f32(), bounded_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn arb_nondegenerate_vec3() -> impl Strategy<Value = Vec3> {
    (
        bounded_nonzero_f32(),
        bounded_nonzero_f32(),
        bounded_nonzero_f32(),
    )
        .prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    // Addition commutativity: a + b == b + a (element-wise)
    #[test]
    fn vec3_add_commutative(a in arb_vec3(), b in arb_vec3()) {
        prop_assert!(vapprox(a + b, b + a, 1e-5));
    }

    // Negation is its own inverse
    #[test]
    fn vec3_neg_involution(a in arb_vec3()) {
        prop_assert!(vapprox(-(-a), a, 0.0));
    }

    // Cross product is orthogonal to both inputs
    #[test]
    fn vec3_cross_orthogonal(a in arb_nondegenerate_vec3(), b in arb_nondegenerate_vec3()) {
        let c = a.cross(b);
        let scale = a.length() * b.length();
        prop_assert!(c.dot(a).abs() <= 1e-2 * scale * a.length());
        prop_assert!(c.dot(b).abs() <= 1e-2 * scale * b.length());
    }

    // Normalizing a nondegenerate vector yields unit length
    #[test]
    fn vec3_normalized_unit(a in arb_nondegenerate_vec3()) {
        prop_assert!(approx(a.normalized().length(), 1.0, 1e-4));
    }

    // lerp endpoints
    #[test]
    fn vec3_lerp_endpoints(a in arb_vec3(), b in arb_vec3()) {
        prop_assert!(vapprox(a.lerp(b, 0.0), a, 0.0));
        let scale = 1.0 + a.length().max(b.length());
        prop_assert!(vapprox(a.lerp(b, 1.0), b, 1e-3 * scale));
    }

    // flat() zeroes the vertical component and keeps the rest
    #[test]
    fn vec3_flat_drops_y(a in arb_vec3()) {
        let f = a.flat();
        prop_assert!(f.y == 0.0 && f.x == a.x && f.z == a.z);
    }
}

proptest! {
    // Round-tripping an axis-angle rotation through Quat recovers the axis
    // direction (up to sign) and angle for non-degenerate rotations.
    #[test]
    fn quat_axis_angle_roundtrip(
        axis in arb_nondegenerate_vec3(),
        angle in 0.1f32..3.0f32,
    ) {
        let n = axis.normalized();
        let half = angle * 0.5;
        let s = half.sin();
        let q = Quat::new(n.x * s, n.y * s, n.z * s, half.cos());
        let (out_axis, out_angle) = q.to_axis_angle();
        prop_assert!(approx(out_angle, angle, 1e-3));
        prop_assert!(vapprox(out_axis, n, 1e-3));
    }
}

#[test]
fn quat_identity_is_degenerate() {
    let (axis, angle) = Quat::IDENTITY.to_axis_angle();
    assert_eq!(angle, 0.0);
    assert_eq!(axis, Vec3::UP);
}
