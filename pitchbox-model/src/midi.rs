//! Standard MIDI File serialization of detected notes.

use midly::num::{u15, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::types::NoteEvent;

/// Pulses per quarter note.
const TICKS_PER_BEAT: u16 = 960;
/// Fixed output tempo. Note times are absolute seconds, so the choice is
/// arbitrary as long as tick conversion uses the same value.
const TEMPO_BPM: u32 = 120;

/// Serialize note events into a single-track Standard MIDI File.
///
/// Events are given a total order (tick, NoteOff before NoteOn, key) before
/// delta encoding, so identical inputs always produce byte-identical files.
/// An empty event list yields a valid file with only tempo and end-of-track.
pub fn render_midi(notes: &[NoteEvent]) -> Vec<u8> {
    let ticks_per_second = TICKS_PER_BEAT as f32 * TEMPO_BPM as f32 / 60.0;

    #[derive(Clone, Copy)]
    struct AbsEvent {
        tick: u32,
        on: bool,
        key: u8,
        vel: u8,
    }

    let mut events: Vec<AbsEvent> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let start_tick = (note.start_seconds * ticks_per_second).round() as u32;
        let end_tick = start_tick + (note.duration_seconds * ticks_per_second).round() as u32;
        let vel = (note.amplitude * 127.0).round().clamp(0.0, 127.0) as u8;
        events.push(AbsEvent {
            tick: start_tick,
            on: true,
            key: note.pitch_midi,
            vel,
        });
        events.push(AbsEvent {
            tick: end_tick,
            on: false,
            key: note.pitch_midi,
            vel,
        });
    }

    events.sort_by_key(|e| (e.tick, e.on, e.key));

    let mut track = Track::new();
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo((60_000_000 / TEMPO_BPM).into())),
    });

    let mut last_tick = 0u32;
    for ev in &events {
        let delta = ev.tick - last_tick;
        last_tick = ev.tick;

        let key = u7::new(ev.key.min(127));
        let vel = u7::new(ev.vel.min(127));
        let message = if ev.on {
            MidiMessage::NoteOn { key, vel }
        } else {
            MidiMessage::NoteOff { key, vel }
        };

        track.push(TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        });
    }

    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    });
    smf.tracks.push(track);

    let mut buffer = Vec::new();
    smf.write_std(&mut buffer)
        .expect("write MIDI to memory buffer");
    buffer
}
