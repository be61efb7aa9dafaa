use crate::consts::{DOP_THRESHOLD, FORMAT_GPMD, HANDLER_META, MAGNETOMETER_CENTER, MAX_TRACKS};

/// Calibration values and track markers used while decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderOptions {
    /// Raw `GPSP` values (DOP x 100) above this
    /// cause `GPS5` records to be dropped.
    pub dop_threshold: u16,
    /// Magnetometer reference center for the X and Y axes.
    pub magnetometer_center: (f64, f64),
    /// Handler type for the telemetry track (`hdlr`).
    pub handler_type: [u8; 4],
    /// Sample description data format for the telemetry track (`stsd`).
    pub sample_format: [u8; 4],
    /// Max number of tracks to consider.
    pub max_tracks: usize,
    /// Return an error if no telemetry track or payloads
    /// are found, instead of empty telemetry.
    pub require_metadata_track: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            dop_threshold: DOP_THRESHOLD,
            magnetometer_center: MAGNETOMETER_CENTER,
            handler_type: HANDLER_META,
            sample_format: FORMAT_GPMD,
            max_tracks: MAX_TRACKS,
            require_metadata_track: false,
        }
    }
}

impl DecoderOptions {
    pub fn with_dop_threshold(self, dop_threshold: u16) -> Self {
        Self {
            dop_threshold,
            ..self
        }
    }

    pub fn with_magnetometer_center(self, x: f64, y: f64) -> Self {
        Self {
            magnetometer_center: (x, y),
            ..self
        }
    }

    pub fn with_handler_type(self, handler_type: [u8; 4]) -> Self {
        Self {
            handler_type,
            ..self
        }
    }

    pub fn with_sample_format(self, sample_format: [u8; 4]) -> Self {
        Self {
            sample_format,
            ..self
        }
    }

    pub fn with_max_tracks(self, max_tracks: usize) -> Self {
        Self {
            max_tracks,
            ..self
        }
    }

    pub fn with_required_metadata_track(self, require: bool) -> Self {
        Self {
            require_metadata_track: require,
            ..self
        }
    }
}
