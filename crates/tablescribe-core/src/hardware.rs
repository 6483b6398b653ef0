//! Accelerator capability check and model profile selection.
//!
//! The local pipeline degrades to a smaller model configuration when no
//! hardware acceleration is present; the check is explicit and logged, never
//! a silent failure downstream.

/// Detected acceleration capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceleration {
    pub gpu: bool,
}

impl Acceleration {
    /// Probe the host for a usable accelerator.
    ///
    /// `TABLESCRIBE_FORCE_CPU` overrides detection for reproducible runs.
    pub fn detect() -> Self {
        if std::env::var_os("TABLESCRIBE_FORCE_CPU").is_some() {
            tracing::info!("hardware: TABLESCRIBE_FORCE_CPU set, acceleration disabled");
            return Self { gpu: false };
        }

        let cuda = std::path::Path::new("/dev/nvidia0").exists()
            || std::env::var("CUDA_VISIBLE_DEVICES")
                .map(|v| !v.is_empty() && v != "-1")
                .unwrap_or(false);
        let metal = cfg!(target_os = "macos");

        let detected = Self { gpu: cuda || metal };
        tracing::info!(
            "hardware: acceleration {}",
            if detected.gpu { "available" } else { "unavailable" }
        );
        detected
    }
}

/// Model configuration tier passed down to the ASR backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelProfile {
    /// Full-size model, requires an accelerator to run at usable speed
    #[default]
    Large,
    /// Smaller, CPU-friendly model
    Small,
}

impl ModelProfile {
    /// Pick the profile matching the detected capabilities.
    pub fn for_acceleration(accel: Acceleration) -> Self {
        if accel.gpu {
            ModelProfile::Large
        } else {
            ModelProfile::Small
        }
    }

    /// Model identifier understood by the whisper-style backends.
    pub fn model_name(&self) -> &'static str {
        match self {
            ModelProfile::Large => "large-v3",
            ModelProfile::Small => "base",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_follows_acceleration() {
        assert_eq!(
            ModelProfile::for_acceleration(Acceleration { gpu: true }),
            ModelProfile::Large
        );
        assert_eq!(
            ModelProfile::for_acceleration(Acceleration { gpu: false }),
            ModelProfile::Small
        );
    }

    #[test]
    fn force_cpu_override_wins() {
        std::env::set_var("TABLESCRIBE_FORCE_CPU", "1");
        let accel = Acceleration::detect();
        std::env::remove_var("TABLESCRIBE_FORCE_CPU");
        assert!(!accel.gpu);
    }

    #[test]
    fn profiles_map_to_model_names() {
        assert_eq!(ModelProfile::Large.model_name(), "large-v3");
        assert_eq!(ModelProfile::Small.model_name(), "base");
    }
}
