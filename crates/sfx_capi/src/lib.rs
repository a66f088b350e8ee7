//! SFX C API
//!
//! Plain C entry points over [`FeatureExtractor`]. The header lives in
//! `include/sfx/api.h`.
//!
//! Errors carry full detail inside the library and are logged with
//! `tracing::error!`; across the boundary they collapse into
//! [`SfxStatus::Error`] or a null pointer.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr;
use std::slice;
use std::sync::Once;

use sfx_core::{
    ExtractionError, ExtractionResult, ExtractorConfig, FeatureData, FeatureExtractor,
    FeatureResult, TransformRegistry, MAX_FEATURES_COUNT,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "SFX_LOG";

static LOGGING: Once = Once::new();

fn init_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("sfx=info"));
        // The host may already have installed a subscriber
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// Call status
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SfxStatus {
    Ok = 0,
    Error = 1,
}

/// Element type of [`SfxFeatureResult::data`]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SfxElementType {
    Int16 = 0,
    Float32 = 1,
}

/// One feature's frames, stored contiguously (`frames * frame_size` elements)
#[repr(C)]
#[derive(Debug)]
pub struct SfxFeatureResult {
    pub frames: usize,
    pub frame_size: usize,
    pub element_type: SfxElementType,
    pub data: *mut c_void,
}

impl SfxFeatureResult {
    fn from_result(result: FeatureResult) -> Self {
        let frame_size = result.frame_size;
        match result.data {
            FeatureData::Int16(frames) => Self::from_frames(frames, frame_size, SfxElementType::Int16),
            FeatureData::Float32(frames) => {
                Self::from_frames(frames, frame_size, SfxElementType::Float32)
            }
        }
    }

    fn from_frames<T>(frames: Vec<Vec<T>>, frame_size: usize, element_type: SfxElementType) -> Self {
        let count = frames.len();
        let flat: Box<[T]> = frames.into_iter().flatten().collect();
        Self {
            frames: count,
            frame_size,
            element_type,
            data: Box::into_raw(flat) as *mut c_void,
        }
    }

    /// Reclaim the buffer allocated by `from_frames`
    ///
    /// # Safety
    /// `self` must have been produced by `from_result` and not released before.
    unsafe fn release(&mut self) {
        if self.data.is_null() {
            return;
        }
        let len = self.frames * self.frame_size;
        match self.element_type {
            SfxElementType::Int16 => {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(self.data as *mut i16, len)))
            }
            SfxElementType::Float32 => {
                drop(Box::from_raw(ptr::slice_from_raw_parts_mut(self.data as *mut f32, len)))
            }
        }
        self.data = ptr::null_mut();
    }
}

/// Opaque configuration handed to C callers
pub struct SfxConfiguration {
    extractor: FeatureExtractor,
}

/// Parse the C feature list into an extractor
///
/// # Safety
/// `features` must point to `count` valid NUL-terminated strings.
unsafe fn build_configuration(
    features: *const *const c_char,
    count: c_int,
    buffer_size: usize,
    sampling_rate: c_int,
) -> ExtractionResult<SfxConfiguration> {
    if features.is_null() {
        return Err(ExtractionError::InvalidConfiguration(
            "Feature list is null".to_string(),
        ));
    }
    let count = usize::try_from(count).map_err(|_| {
        ExtractionError::InvalidConfiguration(format!("Invalid feature count: {count}"))
    })?;
    if count > MAX_FEATURES_COUNT {
        return Err(ExtractionError::TooManyFeatures {
            count,
            max: MAX_FEATURES_COUNT,
        });
    }
    let sampling_rate = u32::try_from(sampling_rate).map_err(|_| {
        ExtractionError::InvalidConfiguration(format!("Invalid sampling rate: {sampling_rate}"))
    })?;

    let descriptions = slice::from_raw_parts(features, count)
        .iter()
        .map(|&name| {
            if name.is_null() {
                return Err(ExtractionError::InvalidConfiguration(
                    "Feature name is null".to_string(),
                ));
            }
            CStr::from_ptr(name).to_str().map_err(|_| {
                ExtractionError::InvalidConfiguration("Feature name is not UTF-8".to_string())
            })
        })
        .collect::<ExtractionResult<Vec<&str>>>()?;

    let config = ExtractorConfig::from_descriptions(&descriptions, buffer_size, sampling_rate)?;
    let extractor = FeatureExtractor::new(&config, TransformRegistry::global())?;
    Ok(SfxConfiguration { extractor })
}

/// Build one pipeline per feature description
///
/// Returns null on any error; nothing is retained in that case.
///
/// # Safety
/// `features` must point to `count` valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn sfx_create_configuration(
    features: *const *const c_char,
    count: c_int,
    buffer_size: usize,
    sampling_rate: c_int,
) -> *mut SfxConfiguration {
    init_logging();
    match build_configuration(features, count, buffer_size, sampling_rate) {
        Ok(configuration) => {
            info!(
                features = configuration.extractor.len(),
                "Created feature configuration"
            );
            Box::into_raw(Box::new(configuration))
        }
        Err(e) => {
            error!("Failed to create feature configuration: {}", e);
            ptr::null_mut()
        }
    }
}

/// Number of features (and results) of a configuration, or -1 for null
///
/// # Safety
/// `configuration` must be null or returned by `sfx_create_configuration`.
#[no_mangle]
pub unsafe extern "C" fn sfx_features_count(configuration: *const SfxConfiguration) -> c_int {
    match configuration.as_ref() {
        Some(configuration) => configuration.extractor.len() as c_int,
        None => -1,
    }
}

/// Compute every feature over `buffer_size` samples at `pcm`
///
/// On success `*results` receives an array of `sfx_features_count` results,
/// released with `sfx_free_results`.
///
/// # Safety
/// `configuration` must come from `sfx_create_configuration`, `pcm` must hold
/// the configured number of samples and `results` must be writable.
#[no_mangle]
pub unsafe extern "C" fn sfx_extract_features(
    configuration: *const SfxConfiguration,
    pcm: *const i16,
    results: *mut *mut SfxFeatureResult,
) -> SfxStatus {
    let (Some(configuration), false, false) =
        (configuration.as_ref(), pcm.is_null(), results.is_null())
    else {
        error!("sfx_extract_features called with a null pointer");
        return SfxStatus::Error;
    };

    let extractor = &configuration.extractor;
    let samples = slice::from_raw_parts(pcm, extractor.config().buffer_size);
    match extractor.extract(samples) {
        Ok(features) => {
            let array: Box<[SfxFeatureResult]> = features
                .into_iter()
                .map(SfxFeatureResult::from_result)
                .collect();
            *results = Box::into_raw(array) as *mut SfxFeatureResult;
            SfxStatus::Ok
        }
        Err(e) => {
            error!("Feature extraction failed: {}", e);
            *results = ptr::null_mut();
            SfxStatus::Error
        }
    }
}

/// Release a configuration and every pipeline it owns
///
/// # Safety
/// `configuration` must be null or returned by `sfx_create_configuration`,
/// and not destroyed before.
#[no_mangle]
pub unsafe extern "C" fn sfx_destroy_configuration(configuration: *mut SfxConfiguration) {
    if !configuration.is_null() {
        drop(Box::from_raw(configuration));
    }
}

/// Release results returned by `sfx_extract_features`
///
/// # Safety
/// `results` must be null or an array returned by `sfx_extract_features`
/// holding exactly `count` entries, and not freed before.
#[no_mangle]
pub unsafe extern "C" fn sfx_free_results(results: *mut SfxFeatureResult, count: c_int) {
    if results.is_null() || count < 0 {
        return;
    }
    let mut array = Box::from_raw(ptr::slice_from_raw_parts_mut(results, count as usize));
    for result in array.iter_mut() {
        result.release();
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    fn names(features: &[&str]) -> (Vec<CString>, Vec<*const c_char>) {
        let owned: Vec<CString> = features.iter().map(|f| CString::new(*f).unwrap()).collect();
        let pointers = owned.iter().map(|c| c.as_ptr()).collect();
        (owned, pointers)
    }

    #[test]
    fn test_full_round_trip() {
        let (_owned, pointers) = names(&[
            "Energy [Window(length=256, step=256, type=rectangular), Energy]",
            "Filtered [Lowpass(frequency=1000)]",
        ]);
        unsafe {
            let configuration =
                sfx_create_configuration(pointers.as_ptr(), pointers.len() as c_int, 1024, 16000);
            assert!(!configuration.is_null());
            assert_eq!(sfx_features_count(configuration), 2);

            let pcm = vec![100i16; 1024];
            let mut results: *mut SfxFeatureResult = ptr::null_mut();
            let status = sfx_extract_features(configuration, pcm.as_ptr(), &mut results);
            assert_eq!(status, SfxStatus::Ok);

            let array = slice::from_raw_parts(results, 2);
            assert_eq!(array[0].frames, 4);
            assert_eq!(array[0].frame_size, 1);
            assert_eq!(array[0].element_type, SfxElementType::Float32);
            let energy = *(array[0].data as *const f32);
            assert!((energy - 10000.0).abs() < 1.0);

            assert_eq!(array[1].frames, 1);
            assert_eq!(array[1].frame_size, 1024 + 63);
            assert_eq!(array[1].element_type, SfxElementType::Int16);

            sfx_free_results(results, 2);
            sfx_destroy_configuration(configuration);
        }
    }

    #[test]
    fn test_unknown_feature_returns_null() {
        let (_owned, pointers) = names(&["Energy [Window, Energy]", "Pitch [Window, Yin]"]);
        let configuration = unsafe {
            sfx_create_configuration(pointers.as_ptr(), pointers.len() as c_int, 4096, 16000)
        };
        assert!(configuration.is_null());
    }

    #[test]
    fn test_rejects_invalid_arguments() {
        unsafe {
            assert!(sfx_create_configuration(ptr::null(), 1, 4096, 16000).is_null());

            let (_owned, pointers) = names(&["Energy [Window, Energy]"]);
            assert!(sfx_create_configuration(pointers.as_ptr(), -1, 4096, 16000).is_null());
            assert!(sfx_create_configuration(pointers.as_ptr(), 1, 4096, -5).is_null());

            let null_name = [ptr::null::<c_char>()];
            assert!(sfx_create_configuration(null_name.as_ptr(), 1, 4096, 16000).is_null());

            let mut results: *mut SfxFeatureResult = ptr::null_mut();
            assert_eq!(
                sfx_extract_features(ptr::null(), ptr::null(), &mut results),
                SfxStatus::Error
            );
            assert_eq!(sfx_features_count(ptr::null()), -1);

            // Null is accepted and ignored
            sfx_destroy_configuration(ptr::null_mut());
            sfx_free_results(ptr::null_mut(), 3);
        }
    }

    #[test]
    fn test_too_many_features() {
        let descriptions = vec!["E [Window, Energy]"; MAX_FEATURES_COUNT + 1];
        let (_owned, pointers) = names(&descriptions);
        let configuration = unsafe {
            sfx_create_configuration(pointers.as_ptr(), pointers.len() as c_int, 4096, 16000)
        };
        assert!(configuration.is_null());
    }
}
