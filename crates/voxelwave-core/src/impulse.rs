//! Impulse extraction from the emitter on/off keyframe track.

use glam::Vec3;

/// One keyframe of the boolean emitter track, in host time units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeSample {
    pub time: f64,
    pub emitting: bool,
}

/// Emitter state captured once when an impulse opens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterSnapshot {
    /// Emitter position in world space.
    pub position: Vec3,
    /// Direction displaced geometry travels in, world space.
    pub displacement_direction: Vec3,
}

/// One continuous "emitter on" interval with a frozen spawn snapshot.
///
/// `end >= start` always holds; zero-duration impulses are discarded by
/// [`extract_impulses`] and never reach the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    pub snapshot: EmitterSnapshot,
    /// Host time units.
    pub start: f64,
    /// Host time units.
    pub end: f64,
}

/// Scans the keyframe track front-to-back and produces the impulse list.
///
/// A false->true transition opens an impulse (snapshot sampled at that
/// time); true->false closes the open impulse; repeated states are ignored.
/// The latest impulse is extended to the last keyframe time so a track that
/// ends while still emitting terminates at the data boundary. Pure function
/// of its inputs.
pub fn extract_impulses(
    samples: &[KeyframeSample],
    mut sample_emitter: impl FnMut(f64) -> EmitterSnapshot,
) -> Vec<Impulse> {
    let mut impulses: Vec<Impulse> = Vec::new();
    let mut was_emitting = false;

    for sample in samples {
        if sample.emitting && !was_emitting {
            impulses.push(Impulse {
                snapshot: sample_emitter(sample.time),
                start: sample.time,
                end: sample.time,
            });
        } else if !sample.emitting && was_emitting {
            if let Some(open) = impulses.last_mut() {
                open.end = sample.time;
            }
        }
        was_emitting = sample.emitting;
    }

    if let (Some(last_impulse), Some(last_sample)) = (impulses.last_mut(), samples.last()) {
        last_impulse.end = last_sample.time;
    }

    impulses.retain(|i| i.end > i.start);
    log::trace!(
        "extracted {} impulses from {} keyframes",
        impulses.len(),
        samples.len()
    );
    impulses
}
