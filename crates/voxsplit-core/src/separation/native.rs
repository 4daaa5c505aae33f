//! Native separation library binding
//!
//! Loads the separation engine from a dynamic library at runtime. The library
//! exposes a small C ABI:
//!
//! ```c
//! void *audio_separation_create(const char *vocal_model, const char *bgm_model,
//!                               int sample_rate, int channels, int data_format);
//! int   audio_separation_add_frames(void *handle, const uint8_t *input, int size);
//! int   audio_separation_separate(void *handle, uint8_t *vocal, uint8_t *bgm, int capacity);
//! void  audio_separation_release(void *handle);
//! ```
//!
//! `data_format` is [`SampleEncoding::engine_index`](crate::pcm::SampleEncoding::engine_index).
//! The library is found by name through the platform loader, or inside an
//! explicit search directory (see [`LibraryLocator`]).

use std::ffi::{c_char, c_int, c_void, CString};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use libloading::Library;

use super::engine::{EngineParams, SeparationEngine};
use super::error::{Result, SeparationError};

/// Base name of the separation library (`libaudio-separation.so` on Linux)
pub const LIBRARY_NAME: &str = "audio-separation";

/// No valid result could be produced
pub const INVALID_RESULT: i32 = -10;
/// The library was handed an invalid handle
pub const INVALID_OBJECT: i32 = -100;

type CreateFn = unsafe extern "C" fn(*const c_char, *const c_char, c_int, c_int, c_int) -> *mut c_void;
type AddFramesFn = unsafe extern "C" fn(*mut c_void, *const u8, c_int) -> c_int;
type SeparateFn = unsafe extern "C" fn(*mut c_void, *mut u8, *mut u8, c_int) -> c_int;
type ReleaseFn = unsafe extern "C" fn(*mut c_void);

/// Resolves the library file to load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryLocator {
    search_path: Option<PathBuf>,
}

impl LibraryLocator {
    /// Let the platform loader search its default locations
    pub fn system() -> Self {
        Self::default()
    }

    /// Load from `dir` instead of the default locations
    ///
    /// An empty path keeps the system lookup.
    pub fn with_search_path(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Self::system();
        }
        Self {
            search_path: Some(dir.to_path_buf()),
        }
    }

    pub fn search_path(&self) -> Option<&Path> {
        self.search_path.as_deref()
    }

    /// Platform file name for `name`, inside the search directory if set
    pub fn resolve(&self, name: &str) -> PathBuf {
        let file_name = PathBuf::from(libloading::library_filename(name));
        match &self.search_path {
            Some(dir) => dir.join(file_name),
            None => file_name,
        }
    }
}

/// Opaque handle returned by `audio_separation_create`
pub struct NativeHandle(NonNull<c_void>);

// SAFETY: the library's estimator object is not tied to the creating thread;
// the orchestrator only ever uses a handle from one thread at a time.
unsafe impl Send for NativeHandle {}

/// Separation engine backed by the native library
pub struct NativeEngine {
    create: CreateFn,
    add_frames: AddFramesFn,
    separate: SeparateFn,
    release: ReleaseFn,
    path: PathBuf,
    // Keeps the function pointers above valid; must outlive them
    _library: Library,
}

impl NativeEngine {
    /// Load the separation library through `locator`
    pub fn load(locator: &LibraryLocator) -> Result<Self> {
        Self::load_from(locator.resolve(LIBRARY_NAME))
    }

    /// Load the separation library from an explicit file
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let load_error = |reason: String| SeparationError::LibraryLoad {
            path: path.clone(),
            reason,
        };

        // SAFETY: loading runs the library's initialisers; the library is a
        // trusted part of the installation.
        let library = unsafe { Library::new(&path) }.map_err(|e| load_error(e.to_string()))?;

        // SAFETY: symbol types match the C ABI documented at module level.
        let (create, add_frames, separate, release) = unsafe {
            let create = *library
                .get::<CreateFn>(b"audio_separation_create\0")
                .map_err(|e| load_error(e.to_string()))?;
            let add_frames = *library
                .get::<AddFramesFn>(b"audio_separation_add_frames\0")
                .map_err(|e| load_error(e.to_string()))?;
            let separate = *library
                .get::<SeparateFn>(b"audio_separation_separate\0")
                .map_err(|e| load_error(e.to_string()))?;
            let release = *library
                .get::<ReleaseFn>(b"audio_separation_release\0")
                .map_err(|e| load_error(e.to_string()))?;
            (create, add_frames, separate, release)
        };

        log::info!("Loaded separation library {:?}", path);

        Ok(Self {
            create,
            add_frames,
            separate,
            release,
            path,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn path_to_cstring(path: &Path) -> Option<CString> {
    let text = path.to_str()?;
    CString::new(text).ok()
}

impl SeparationEngine for NativeEngine {
    type Handle = NativeHandle;

    fn construct(&self, params: &EngineParams<'_>) -> Option<NativeHandle> {
        let (Some(vocal), Some(bgm)) = (
            path_to_cstring(params.vocal_model),
            path_to_cstring(params.bgm_model),
        ) else {
            log::error!("Model paths are not valid C strings");
            return None;
        };
        let sample_rate = c_int::try_from(params.stream.sample_rate).ok()?;

        // SAFETY: both strings outlive the call; the library copies what it keeps.
        let raw = unsafe {
            (self.create)(
                vocal.as_ptr(),
                bgm.as_ptr(),
                sample_rate,
                c_int::from(params.stream.channels),
                params.stream.encoding.engine_index(),
            )
        };
        match NonNull::new(raw) {
            Some(ptr) => Some(NativeHandle(ptr)),
            None => {
                log::error!("audio_separation_create returned null");
                None
            }
        }
    }

    fn add_frames(&self, handle: &mut NativeHandle, input: &[u8]) -> i32 {
        let Ok(size) = c_int::try_from(input.len()) else {
            log::error!("Input of {} bytes exceeds the native size limit", input.len());
            return INVALID_RESULT;
        };
        // SAFETY: `input` is valid for `size` bytes for the duration of the call.
        unsafe { (self.add_frames)(handle.0.as_ptr(), input.as_ptr(), size) }
    }

    fn separate(&self, handle: &mut NativeHandle, vocal: &mut [u8], bgm: &mut [u8]) -> i32 {
        let Ok(capacity) = c_int::try_from(vocal.len().min(bgm.len())) else {
            return INVALID_RESULT;
        };
        // SAFETY: both buffers are writable for `capacity` bytes.
        unsafe {
            (self.separate)(
                handle.0.as_ptr(),
                vocal.as_mut_ptr(),
                bgm.as_mut_ptr(),
                capacity,
            )
        }
    }

    fn release(&self, handle: NativeHandle) {
        // SAFETY: the handle came from `create` and is consumed here.
        unsafe { (self.release)(handle.0.as_ptr()) }
    }

    fn name(&self) -> &'static str {
        "native"
    }
}
