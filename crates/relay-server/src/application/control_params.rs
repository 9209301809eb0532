//! Mixer control parameters carried in image names.
//!
//! The client encodes the current mixer settings as the name of each image
//! message, e.g.
//!
//! ```text
//! Scrn_H 1024 Scrn_V 768 Noise_Gn 60 In_Gn 75 Out_Gn 180 Gma_Gn 100 Cycle_Tme 64 Fade_Tme 38
//! ```
//!
//! Gains are percentages; times are in frames (1/30 s).

use std::fmt;

/// Numeric parameter set consumed by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerParams {
    pub screen_h: i32,
    pub screen_v: i32,
    pub noise_gain: i32,
    pub input_gain: i32,
    pub output_gain: i32,
    pub gamma_gain: i32,
    pub cycle_time: i32,
    pub fade_time: i32,
    pub full_screen: bool,
}

impl Default for MixerParams {
    fn default() -> Self {
        Self {
            screen_h: 1024,
            screen_v: 768,
            noise_gain: 60,
            input_gain: 75,
            output_gain: 180,
            gamma_gain: 100,
            cycle_time: 64,
            fade_time: 38,
            full_screen: false,
        }
    }
}

impl MixerParams {
    /// Applies every recognised `key value` pair in `text` and returns how
    /// many were applied.
    ///
    /// Unknown keys are skipped; missing keys keep their current value.
    /// Parsing stops at the first pair whose value is not an integer.
    pub fn apply(&mut self, text: &str) -> usize {
        let mut tokens = text.split_whitespace();
        let mut applied = 0;
        while let (Some(key), Some(value)) = (tokens.next(), tokens.next()) {
            let Ok(value) = value.parse::<i32>() else {
                break;
            };
            let slot = match key {
                "Scrn_H" => &mut self.screen_h,
                "Scrn_V" => &mut self.screen_v,
                "Noise_Gn" => &mut self.noise_gain,
                "In_Gn" => &mut self.input_gain,
                "Out_Gn" => &mut self.output_gain,
                "Gma_Gn" => &mut self.gamma_gain,
                "Cycle_Tme" => &mut self.cycle_time,
                "Fade_Tme" => &mut self.fade_time,
                "Full_Screen_Enable" => {
                    self.full_screen = value == 1;
                    applied += 1;
                    continue;
                }
                _ => continue,
            };
            *slot = value;
            applied += 1;
        }
        applied
    }

    /// Parses `text` on top of the defaults.
    pub fn parse(text: &str) -> Self {
        let mut params = Self::default();
        params.apply(text);
        params
    }

    /// Cross-fade weight `frames` ticks after a new image: rises linearly
    /// to 1.0 over `fade_time` frames.
    pub fn fade_value(&self, frames: i32) -> f32 {
        if self.fade_time <= 0 {
            return 1.0;
        }
        frames.clamp(0, self.fade_time) as f32 / self.fade_time as f32
    }

    pub fn frame_len(&self) -> usize {
        (self.screen_h.max(0) as usize) * (self.screen_v.max(0) as usize)
    }
}

impl fmt::Display for MixerParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scrn_H {} Scrn_V {} Noise_Gn {} In_Gn {} Out_Gn {} Gma_Gn {} Cycle_Tme {} Fade_Tme {} Full_Screen_Enable {}",
            self.screen_h,
            self.screen_v,
            self.noise_gain,
            self.input_gain,
            self.output_gain,
            self.gamma_gain,
            self.cycle_time,
            self.fade_time,
            u8::from(self.full_screen)
        )
    }
}
