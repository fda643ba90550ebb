use crate::audio::AudioOutput;
use crate::mpris::MprisHandle;
use crate::player::Controller;

/// Push the transport state to the bus. Cheap when nothing but the position
/// moved.
pub fn update_mpris<O: AudioOutput>(mpris: &MprisHandle, controller: &Controller<O>) {
    mpris.update(&controller.snapshot());
}

/// Emit `Seeked` for a position jump the clients could not have predicted.
pub fn announce_seek<O: AudioOutput>(mpris: &MprisHandle, controller: &Controller<O>) {
    if controller.current_track().is_some() {
        mpris.seeked(controller.position());
    }
}
