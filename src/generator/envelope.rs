//! Exponential-curve ADSR envelope
//!
//! Every segment follows the normalized curve
//! `f(x, c) = (2^(16cx) - 1) / (2^(16c) - 1)`, which maps `[0, 1]` onto
//! `[0, 1]`; the sign and magnitude of `c` bend it. The envelope is a pure
//! function of the time since note start and, once the note was released,
//! the time of the release.

/// Shape parameters, all times in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeShape {
    /// Attack duration (a0)
    pub attack: f32,
    /// Attack curvature (a1)
    pub attack_curve: f32,
    /// Decay duration (d0)
    pub decay: f32,
    /// Minimum time held after the attack, even for very short notes (ds0)
    pub min_hold: f32,
    /// Decay curvature (d1)
    pub decay_curve: f32,
    /// Level reached at the end of the decay (s1)
    pub sustain: f32,
    /// Release duration (r0)
    pub release: f32,
    /// Release curvature (r1)
    pub release_curve: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdsrPhase {
    Attack,
    Decay,
    Sustain,
    Release,
    Complete,
}

/// Normalized exponential curve
pub fn curve(x: f32, c: f32) -> f32 {
    if c.abs() < 1e-6 {
        return x;
    }
    ((16.0 * c * x).exp2() - 1.0) / ((16.0 * c).exp2() - 1.0)
}

impl EnvelopeShape {
    /// Time at which the release starts for a note held `held` seconds
    pub fn release_start(&self, held: f32) -> f32 {
        held.max(self.attack + self.min_hold)
    }

    /// Envelope level at `t` seconds after note start
    ///
    /// `note_off` is the time the note was released, if it was. Returns
    /// `None` once the release has fully decayed: the voice is finished.
    pub fn level(&self, t: f32, note_off: Option<f32>) -> Option<f32> {
        if t < self.attack {
            return Some(curve(t / self.attack, self.attack_curve));
        }

        if let Some(held) = note_off {
            let start = self.release_start(held);
            if t > start {
                let dt = t - start;
                if dt >= self.release {
                    return None;
                }
                let from = self.decay_sustain(start - self.attack);
                return Some(from * (1.0 - curve(dt / self.release, self.release_curve)));
            }
        }

        Some(self.decay_sustain(t - self.attack))
    }

    /// Phase the envelope is in at `t`
    pub fn phase(&self, t: f32, note_off: Option<f32>) -> AdsrPhase {
        if t < self.attack {
            return AdsrPhase::Attack;
        }
        if let Some(held) = note_off {
            let start = self.release_start(held);
            if t > start {
                return if t - start < self.release {
                    AdsrPhase::Release
                } else {
                    AdsrPhase::Complete
                };
            }
        }
        if t - self.attack < self.decay {
            AdsrPhase::Decay
        } else {
            AdsrPhase::Sustain
        }
    }

    fn decay_sustain(&self, x: f32) -> f32 {
        if x < self.decay {
            1.0 - curve(x / self.decay, self.decay_curve) * (1.0 - self.sustain)
        } else {
            self.sustain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn shape() -> EnvelopeShape {
        EnvelopeShape {
            attack: 0.02,
            attack_curve: -0.3,
            decay: 1.0,
            min_hold: 0.0,
            decay_curve: -0.35,
            sustain: 0.1,
            release: 0.5,
            release_curve: -0.5,
        }
    }

    #[test]
    fn test_curve_endpoints() {
        for c in [-0.5, -0.1, 0.0, 0.2, 0.45] {
            assert_abs_diff_eq!(curve(0.0, c), 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(curve(1.0, c), 1.0, epsilon = 1e-5);
        }
        // Negative curvature rises fast then flattens
        assert!(curve(0.5, -0.5) > 0.5);
        assert!(curve(0.5, 0.5) < 0.5);
    }

    #[test]
    fn test_attack_rises_to_peak() {
        let env = shape();
        assert_abs_diff_eq!(env.level(0.0, None).unwrap(), 0.0, epsilon = 1e-6);
        let mid = env.level(0.01, None).unwrap();
        assert!(mid > 0.0 && mid < 1.0);
        assert_abs_diff_eq!(env.level(0.02, None).unwrap(), 1.0, epsilon = 1e-5);
        assert_eq!(env.phase(0.01, None), AdsrPhase::Attack);
    }

    #[test]
    fn test_decay_then_sustain() {
        let env = shape();
        let early = env.level(0.1, None).unwrap();
        let late = env.level(0.9, None).unwrap();
        assert!(early > late);
        assert!(late >= 0.1);
        assert_eq!(env.phase(0.5, None), AdsrPhase::Decay);

        // Past attack + decay the level holds at the sustain value forever
        assert_abs_diff_eq!(env.level(1.5, None).unwrap(), 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(env.level(600.0, None).unwrap(), 0.1, epsilon = 1e-6);
        assert_eq!(env.phase(600.0, None), AdsrPhase::Sustain);
    }

    #[test]
    fn test_release_terminates() {
        let env = shape();
        let d = 2.0;

        for step in 0..50 {
            let dt = step as f32 * 0.01;
            let level = env.level(d + dt, Some(d));
            assert!(matches!(level, Some(v) if v >= 0.0), "dt {} gave {:?}", dt, level);
        }
        assert_eq!(env.level(d + 0.5, Some(d)), None);
        assert_eq!(env.level(d + 0.75, Some(d)), None);
        assert_eq!(env.phase(d + 0.75, Some(d)), AdsrPhase::Complete);
    }

    #[test]
    fn test_release_is_continuous() {
        let env = shape();
        let held = 0.3;
        let before = env.level(held, Some(held)).unwrap();
        let after = env.level(held + 1e-4, Some(held)).unwrap();
        assert_abs_diff_eq!(before, after, epsilon = 1e-3);
        assert_eq!(env.phase(held + 0.1, Some(held)), AdsrPhase::Release);
    }

    #[test]
    fn test_short_note_holds_minimum() {
        let env = EnvelopeShape {
            min_hold: 0.5,
            ..shape()
        };
        // Released at once, but held until attack + min_hold
        assert_abs_diff_eq!(env.release_start(0.0), 0.52, epsilon = 1e-6);
        assert_eq!(env.phase(0.3, Some(0.0)), AdsrPhase::Decay);
        assert_eq!(env.phase(0.6, Some(0.0)), AdsrPhase::Release);
        assert!(env.level(1.1, Some(0.0)).is_none());
    }

    #[test]
    fn test_zero_length_segments() {
        let env = EnvelopeShape {
            attack: 0.0,
            decay: 0.0,
            ..shape()
        };
        assert_abs_diff_eq!(env.level(0.0, None).unwrap(), 0.1, epsilon = 1e-6);
    }
}
