// src/synth/envelope.rs
//
// Linear attack/release envelope.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Sustain,
    Release,
}

pub struct Envelope {
    stage: Stage,
    level: f64,

    // Times in milliseconds
    attack_ms: f64,
    release_ms: f64,

    sample_rate: f64,
    release_level: f64,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            level: 0.0,
            attack_ms: 10.0,
            release_ms: 200.0,
            sample_rate: 48_000.0,
            release_level: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub fn set_attack_ms(&mut self, ms: f64) {
        self.attack_ms = ms.max(0.0);
    }

    pub fn set_release_ms(&mut self, ms: f64) {
        self.release_ms = ms.max(0.0);
    }

    /// Start (or restart) the attack from the current level.
    pub fn gate_on(&mut self) {
        self.stage = Stage::Attack;
    }

    pub fn gate_off(&mut self) {
        if matches!(self.stage, Stage::Attack | Stage::Sustain) {
            self.release_level = self.level;
            self.stage = Stage::Release;
        }
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.level = 0.0;
    }

    #[inline]
    fn samples(&self, ms: f64) -> f64 {
        (ms * self.sample_rate / 1000.0).max(1.0)
    }

    #[inline]
    pub fn next(&mut self) -> f64 {
        match self.stage {
            Stage::Idle => 0.0,

            Stage::Attack => {
                self.level += 1.0 / self.samples(self.attack_ms);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Sustain;
                }
                self.level
            }

            Stage::Sustain => self.level,

            Stage::Release => {
                self.level -= self.release_level / self.samples(self.release_ms);
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
                self.level
            }
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(attack_ms: f64, release_ms: f64) -> Envelope {
        let mut env = Envelope::new();
        env.set_sample_rate(1000.0);
        env.set_attack_ms(attack_ms);
        env.set_release_ms(release_ms);
        env
    }

    #[test]
    fn test_idle_is_silent() {
        let mut env = env(10.0, 10.0);
        assert_eq!(env.next(), 0.0);
        assert!(env.is_idle());
    }

    #[test]
    fn test_attack_reaches_full_level() {
        let mut env = env(10.0, 10.0);
        env.gate_on();
        let levels: Vec<f64> = (0..10).map(|_| env.next()).collect();
        assert!((levels[0] - 0.1).abs() < 1e-9);
        assert_eq!(levels[9], 1.0);
        assert_eq!(env.next(), 1.0);
    }

    #[test]
    fn test_release_returns_to_idle() {
        let mut env = env(0.0, 5.0);
        env.gate_on();
        env.next();
        env.gate_off();
        for _ in 0..5 {
            env.next();
        }
        assert!(env.is_idle());
        assert_eq!(env.next(), 0.0);
    }

    #[test]
    fn test_gate_off_when_idle_is_ignored() {
        let mut env = env(10.0, 10.0);
        env.gate_off();
        assert!(env.is_idle());
    }
}
