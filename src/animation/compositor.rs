//! Priority-layered composition.
//!
//! Runs over a mixer's active bindings, which are already sorted by
//! priority (descending) with equal priorities contiguous.
//!
//! **Stage A** walks one priority level at a time. Entries of a level are
//! averaged by contribution into one level pose whose contribution is the
//! per-lane maximum. Additive attenuation is tracked alongside and folded
//! in at each level boundary.
//!
//! Once every lane's maximum contribution saturates, lower levels no longer
//! produce poses. They are still walked while additive layers below are
//! pending, but only for the additive bookkeeping. A full-contribution level
//! therefore overrides everything below it.
//!
//! **Stage B** folds the level poses from the lowest priority up. Each level
//! is blended over the running result by its contribution relative to the
//! running contribution sum, so a partial level leaves the background
//! visible in proportion.

use bumpalo::Bump;
use smallvec::SmallVec;

use crate::animation::binding::BindingNode;
use crate::animation::computed::ComputedValue;
use crate::animation::value::FrameContext;
use crate::animation::values::Blendable;
use crate::settings::weight_at;

/// One folded priority level.
struct Level<'a, T> {
    value: &'a mut [T],
    contribution: &'a mut [f32],
}

/// Composes `active` into `out`.
///
/// `out.value` is read as the seed for every lane nobody writes.
/// `additive_priority` is the lowest priority carrying an additive value;
/// levels at or above it take part in additive attenuation.
pub(crate) fn composite<T: Blendable>(
    active: &mut [BindingNode<T>],
    additive_priority: i32,
    out: &mut ComputedValue<'_, T>,
    ctx: &FrameContext<'_>,
) {
    out.additive_value.fill(T::IDENTITY);
    if active.is_empty() {
        out.contribution.fill(0.0);
        out.additive_mix.fill(1.0);
        return;
    }

    let controllers = ctx.controllers;
    let arena = ctx.arena;
    let settings = ctx.settings;
    let lanes = out.len();

    let max_contribution = arena.alloc_slice_fill_copy(lanes, 0.0_f32);
    let min_additive = arena.alloc_slice_fill_copy(lanes, 1.0_f32);
    let additive = arena.alloc_slice_fill_copy(lanes, 1.0_f32);

    let mut levels: SmallVec<[Level<'_, T>; 8]> = SmallVec::new();
    let mut pose_saturated = false;
    let mut entries: SmallVec<[ComputedValue<'_, T>; 8]> = SmallVec::new();

    // ========================================================================
    // Stage A: per priority level
    // ========================================================================
    let mut start = 0;
    while start < active.len() {
        let Some(priority) = active[start].priority(controllers) else {
            start += 1;
            continue;
        };
        let end = active[start..]
            .iter()
            .position(|n| n.priority(controllers) != Some(priority))
            .map_or(active.len(), |offset| start + offset);
        let in_additive_band = priority >= additive_priority;

        for node in &mut active[start..end] {
            let Some(controller) = controllers.get(node.controller) else {
                continue;
            };
            if !controller.is_playing() {
                continue;
            }

            let weights = node.weights.as_slice();
            let value_is_additive = node.value.is_additive();
            let mut entry = ComputedValue::alloc_seeded(arena, &*out.value);
            node.value.compute(&mut entry, controller, weights, ctx);
            if controller.is_mirrored() && !node.value.handles_mirroring() {
                entry.mirror(value_is_additive);
            }

            if in_additive_band {
                let mix = controller.additive_mix();
                for (b, min) in min_additive.iter_mut().enumerate() {
                    let attenuation = 1.0 + weight_at(weights, b) * (mix * entry.additive_mix[b] - 1.0);
                    *min = min.min(attenuation);
                }
                if value_is_additive {
                    for (b, &remaining) in additive.iter().enumerate() {
                        if remaining > settings.negligible_contribution {
                            out.additive_value[b] =
                                T::blend_additive(out.additive_value[b], entry.additive_value[b], remaining);
                        }
                    }
                }
            }

            if !pose_saturated
                && entry
                    .contribution
                    .iter()
                    .any(|&c| c > settings.negligible_contribution)
            {
                entries.push(entry);
            }
        }

        // Level boundary.
        for (a, min) in additive.iter_mut().zip(min_additive.iter_mut()) {
            *a *= *min;
            *min = 1.0;
        }

        if !entries.is_empty() {
            let level = fold_level(arena, &entries, settings.epsilon);
            for (max, &c) in max_contribution.iter_mut().zip(level.contribution.iter()) {
                *max = max.max(c);
            }
            levels.push(level);
            entries.clear();

            pose_saturated = max_contribution
                .iter()
                .all(|&c| c > settings.saturation_threshold);
        }

        let additive_spent = priority <= additive_priority
            || additive.iter().all(|&a| a <= settings.negligible_contribution);
        if pose_saturated && additive_spent {
            log::trace!("Pose saturated at priority {priority}, skipping lower levels");
            break;
        }

        start = end;
    }

    out.additive_mix.copy_from_slice(&additive[..]);

    // ========================================================================
    // Stage B: across priority levels, lowest first
    // ========================================================================
    let Some((lowest, higher)) = levels.split_last() else {
        out.contribution.copy_from_slice(&max_contribution[..]);
        return;
    };

    out.value.copy_from_slice(&lowest.value[..]);
    out.contribution.copy_from_slice(&lowest.contribution[..]);
    for level in higher.iter().rev() {
        for b in 0..lanes {
            let c = level.contribution[b];
            let running = out.contribution[b] + c;
            out.contribution[b] = running;
            T::blend(&mut out.value[b], &level.value[b], c / running.max(settings.epsilon));
        }
    }
}

/// Contribution-weighted average of one level's entries.
///
/// Built progressively: entry `i` is blended in with weight `c_i / Σ_{j≤i} c_j`,
/// which yields the normalised weighted average.
fn fold_level<'a, T: Blendable>(
    arena: &'a Bump,
    entries: &[ComputedValue<'_, T>],
    epsilon: f32,
) -> Level<'a, T> {
    let first = &entries[0];
    let value = arena.alloc_slice_copy(&first.value[..]);
    let contribution = arena.alloc_slice_copy(&first.contribution[..]);
    let total = arena.alloc_slice_copy(&first.contribution[..]);

    for entry in &entries[1..] {
        for (b, &c) in entry.contribution.iter().enumerate() {
            if c <= 0.0 {
                continue;
            }
            total[b] += c;
            T::blend(&mut value[b], &entry.value[b], c / total[b].max(epsilon));
            contribution[b] = contribution[b].max(c);
        }
    }

    Level { value, contribution }
}
