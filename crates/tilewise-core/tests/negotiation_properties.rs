//! Invariants of the negotiation arithmetic over generated inputs.

use proptest::prelude::*;
use tilewise_core::{
    adjust_down, adjust_up, calculate_max_window, calculate_max_window_for_shape, intersect_valid_regions,
    update_window_and_padding, AccessWindow, AccessWindowHorizontal, AccessWindowRectangle, BorderSize, Coordinates,
    DataType, Dimension, Steps, TensorInfo, TensorShape, ValidRegion, Window,
};

fn region_strategy() -> impl Strategy<Value = ValidRegion> {
    (0i32..12, 0i32..12, 0usize..12, 0usize..12)
        .prop_map(|(x, y, w, h)| ValidRegion::new(Coordinates::from([x, y]), TensorShape::new(&[w, h])))
}

fn scale_strategy() -> impl Strategy<Value = f32> {
    prop_oneof![Just(0.5f32), Just(1.0f32), Just(2.0f32)]
}

fn positions(d: Dimension) -> Vec<i32> {
    (d.start()..d.end()).step_by(d.step().max(1) as usize).collect()
}

/// Tensor elements `[lo, hi)` touched along one axis from window position `p`.
fn touched(p: i32, scale: f32, offset: i32, extent: i32) -> (i32, i32) {
    let scaled = p as f32 * scale;
    (scaled.floor() as i32 + offset, scaled.ceil() as i32 + offset + extent)
}

/// Every access of `window` on one axis lies in `[-front, len + back)`.
fn accesses_fit(d: Dimension, scale: f32, offset: i32, extent: i32, len: usize, front: u32, back: u32) -> bool {
    positions(d).into_iter().all(|p| {
        let (lo, hi) = touched(p, scale, offset, extent);
        lo >= -(front as i32) && hi <= len as i32 + back as i32
    })
}

/// Compare by start/end per axis; trailing unit extents change the rank
/// bookkeeping but not the covered elements.
fn same_extent(a: &ValidRegion, b: &ValidRegion) -> bool {
    (0..2).all(|d| a.start(d) == b.start(d) && a.end(d) == b.end(d))
}

proptest! {
    #[test]
    fn adjust_down_lands_on_step_grid(required in -200i32..200, available in -200i32..200, step in 1i32..32) {
        let adjusted = adjust_down(required, available, step);
        prop_assert_eq!((required - adjusted) % step, 0);
        if required <= available {
            prop_assert_eq!(adjusted, required);
        } else {
            prop_assert!(adjusted <= available);
            prop_assert!(adjusted + step > available);
        }
    }

    #[test]
    fn adjust_up_lands_on_step_grid(required in -200i32..200, available in -200i32..200, step in 1i32..32) {
        let adjusted = adjust_up(required, available, step);
        prop_assert_eq!((adjusted - required) % step, 0);
        prop_assert!(adjusted >= available || adjusted == required);
        if required < available {
            prop_assert!(adjusted - step < available);
        }
    }

    #[test]
    fn intersection_is_commutative(a in region_strategy(), b in region_strategy()) {
        prop_assert!(same_extent(&intersect_valid_regions(&[a, b]), &intersect_valid_regions(&[b, a])));
    }

    #[test]
    fn intersection_is_associative(a in region_strategy(), b in region_strategy(), c in region_strategy()) {
        let left = intersect_valid_regions(&[intersect_valid_regions(&[a, b]), c]);
        let right = intersect_valid_regions(&[a, intersect_valid_regions(&[b, c])]);
        prop_assert!(same_extent(&left, &right) || (left.is_empty() && right.is_empty()));
    }

    #[test]
    fn intersection_is_idempotent(a in region_strategy()) {
        prop_assert!(same_extent(&intersect_valid_regions(&[a, a]), &a));
    }

    #[test]
    fn grown_padding_covers_every_access(
        width in 1usize..40,
        height in 1usize..12,
        step in 1i32..17,
        x in -4i32..4,
        y in -3i32..3,
        access_width in 0i32..24,
        access_height in 0i32..6,
    ) {
        let mut info = TensorInfo::new(TensorShape::from([width, height]), DataType::U8);
        let window = calculate_max_window_for_shape(info.tensor_shape(), &Steps::new(&[step]));
        AccessWindowRectangle::new(&mut info, x, y, access_width, access_height).update_padding_if_needed(&window);
        let pad = info.padding();

        let mut px = window.x().start();
        while px < window.x().end() {
            prop_assert!(px + x >= -(pad.left as i32));
            prop_assert!(px + x + access_width <= (width as i32) + pad.right as i32);
            px += step;
        }
        for py in window.y().start()..window.y().end() {
            prop_assert!(py + y >= -(pad.top as i32));
            prop_assert!(py + y + access_height <= (height as i32) + pad.bottom as i32);
        }
    }

    #[test]
    fn scaled_padding_covers_every_access(
        width in 1usize..40,
        height in 1usize..12,
        step in 1i32..17,
        x in -4i32..4,
        y in -3i32..3,
        access_width in 0i32..24,
        access_height in 0i32..6,
        scale_x in scale_strategy(),
        scale_y in scale_strategy(),
    ) {
        let mut info = TensorInfo::new(TensorShape::from([width, height]), DataType::U8);
        let mut window = calculate_max_window_for_shape(info.tensor_shape(), &Steps::new(&[step]));
        let before = window;
        let mut access =
            AccessWindowRectangle::with_scale(&mut info, x, y, access_width, access_height, scale_x, scale_y);
        prop_assert!(!update_window_and_padding(&mut window, &mut [&mut access]));
        drop(access);
        prop_assert_eq!(window, before);

        let pad = info.padding();
        prop_assert!(accesses_fit(window.x(), scale_x, x, access_width, width, pad.left, pad.right));
        prop_assert!(accesses_fit(window.y(), scale_y, y, access_height, height, pad.top, pad.bottom));
    }

    #[test]
    fn shrunk_window_stays_in_fixed_padding(
        width in 1usize..40,
        height in 1usize..12,
        window_width in 1usize..48,
        window_height in 1usize..16,
        step in 1i32..17,
        x in -4i32..4,
        y in -3i32..3,
        access_width in 0i32..24,
        access_height in 0i32..6,
        scale_x in scale_strategy(),
        scale_y in scale_strategy(),
        (top, right, bottom, left) in (0u32..4, 0u32..9, 0u32..4, 0u32..4),
    ) {
        let padding = BorderSize::new(top, right, bottom, left);
        let mut info = TensorInfo::new(TensorShape::from([width, height]), DataType::U8);
        info.extend_padding(&padding);
        info.set_is_resizable(false);

        let original =
            calculate_max_window_for_shape(&TensorShape::from([window_width, window_height]), &Steps::new(&[step]));
        let mut window = original;
        let mut access =
            AccessWindowRectangle::with_scale(&mut info, x, y, access_width, access_height, scale_x, scale_y);
        let needed = access.get_needed_padding(&original);
        let changed = update_window_and_padding(&mut window, &mut [&mut access]);
        drop(access);

        prop_assert_eq!(info.padding(), padding);
        prop_assert_eq!(changed, needed.max(&padding) != padding);
        prop_assert!(accesses_fit(window.x(), scale_x, x, access_width, width, left, right));
        prop_assert!(accesses_fit(window.y(), scale_y, y, access_height, height, top, bottom));
        for d in 0..2 {
            prop_assert!(window[d].start() >= original[d].start());
            prop_assert!(window[d].end() <= original[d].end());
        }
    }

    #[test]
    fn unbordered_region_over_covering_window_is_input(
        ax in 0i32..6, ay in 0i32..6, w in 1usize..20, h in 1usize..8, step in 1i32..9,
    ) {
        let input = ValidRegion::new(Coordinates::from([ax, ay]), TensorShape::from([w, h]));
        let window = calculate_max_window(&input, &Steps::new(&[step]), false, BorderSize::empty());
        let mut out = TensorInfo::new(
            TensorShape::from([ax as usize + w + 1, ay as usize + h + 1]),
            DataType::U8,
        );
        let access = AccessWindowHorizontal::new(&mut out, 0, step);
        let region = access.compute_valid_region_without_border(&window, input);
        prop_assert!(same_extent(&region, &input));
    }

    #[test]
    fn negotiation_ignores_pattern_order(
        width in 4usize..30,
        height in 2usize..10,
        step in 1i32..9,
        left in 0u32..3,
        right in 0u32..9,
        top in 0u32..2,
        bottom in 0u32..2,
    ) {
        let run = |reverse: bool| {
            let mut src = TensorInfo::new(TensorShape::from([width, height]), DataType::U8);
            src.extend_padding(&BorderSize::new(top, right, bottom, left));
            src.set_is_resizable(false);
            let mut dst = TensorInfo::new(TensorShape::from([width, height]), DataType::U8);
            let mut window = calculate_max_window_for_shape(dst.tensor_shape(), &Steps::new(&[step]));
            let mut input = AccessWindowRectangle::new(&mut src, -1, -1, step + 2, 3);
            let mut output = AccessWindowHorizontal::new(&mut dst, 0, step);
            let changed = if reverse {
                update_window_and_padding(&mut window, &mut [&mut output, &mut input])
            } else {
                update_window_and_padding(&mut window, &mut [&mut input, &mut output])
            };
            drop(output);
            (changed, window, dst.padding())
        };
        prop_assert_eq!(run(false), run(true));
    }
}

proptest! {
    #[test]
    fn split_window_partitions_cover_once(
        start in -8i32..8,
        iterations in 0i32..50,
        step in 1i32..5,
        total in 1usize..9,
    ) {
        let mut window = Window::new();
        window.set(1, Dimension::new(start, start + iterations * step, step));

        let mut covered = Vec::new();
        for id in 0..total {
            let part = window.split_window(1, id, total);
            prop_assert_eq!(part.x(), window.x());
            let d = part.y();
            prop_assert_eq!(d.step(), step);
            covered.extend((d.start()..d.end()).step_by(step as usize));
        }
        let expected: Vec<i32> = (start..start + iterations * step).step_by(step as usize).collect();
        prop_assert_eq!(covered, expected);
    }
}
