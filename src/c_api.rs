// File: src/c_api.rs
// Handle-based C ABI. Results cross the boundary as JSON strings the caller must
// release with `kbd_string_free`; panics are caught here and never unwind into C.
use crate::config::EngineConfig;
use crate::core::types::{Point, Verbosity};
use crate::error::EngineResult;
use crate::KeyboardEngine;
use libc::c_char;
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::ptr;
use tracing::{error, info};

unsafe fn str_arg<'a>(raw: *const c_char) -> Option<&'a str> {
    if raw.is_null() {
        return None;
    }
    CStr::from_ptr(raw).to_str().ok()
}

fn words(raw: Option<&str>) -> Vec<&str> {
    raw.map(|s| s.split_whitespace().collect()).unwrap_or_default()
}

/// `xy` holds `count` interleaved x/y pairs; null yields an empty path.
unsafe fn points_arg(xy: *const f64, count: usize) -> Vec<Point> {
    if xy.is_null() {
        return Vec::new();
    }
    std::slice::from_raw_parts(xy, count.saturating_mul(2))
        .chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect()
}

fn into_c_string(json: String) -> *mut c_char {
    CString::new(json)
        .or_else(|_| CString::new(error_json("interior nul in result")))
        .unwrap_or_default()
        .into_raw()
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Runs `f` against the engine behind `handle` and encodes the outcome as JSON.
unsafe fn respond<T, F>(handle: *const KeyboardEngine, name: &str, f: F) -> *mut c_char
where
    T: Serialize,
    F: FnOnce(&KeyboardEngine) -> EngineResult<T>,
{
    let Some(engine) = handle.as_ref() else {
        return into_c_string(error_json("null engine handle"));
    };
    let result = catch_unwind(AssertUnwindSafe(|| f(engine)));
    let json = match result {
        Ok(Ok(value)) => {
            serde_json::to_string(&value).unwrap_or_else(|e| error_json(&e.to_string()))
        }
        Ok(Err(e)) => error_json(&e.to_string()),
        Err(_) => {
            error!("Panic in {}", name);
            error_json("internal panic")
        }
    };
    into_c_string(json)
}

/// Creates an engine from a JSON config. A null or empty config selects the defaults.
/// Returns null when the config is invalid.
///
/// # Safety
/// `config_json` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn kbd_engine_new(config_json: *const c_char) -> *mut KeyboardEngine {
    let raw = str_arg(config_json).unwrap_or("").trim().to_string();
    let result = catch_unwind(|| {
        let config = if raw.is_empty() {
            EngineConfig::default()
        } else {
            EngineConfig::from_json_str(&raw)?
        };
        KeyboardEngine::new(config)
    });
    match result {
        Ok(Ok(engine)) => {
            info!("Keyboard engine created");
            Box::into_raw(Box::new(engine))
        }
        Ok(Err(e)) => {
            error!("Engine creation failed: {}", e);
            ptr::null_mut()
        }
        Err(_) => {
            error!("Panic during engine creation");
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `engine` must come from `kbd_engine_new` and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn kbd_engine_free(engine: *mut KeyboardEngine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Frequency of `word`, 0 when unknown.
///
/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_lookup(
    engine: *const KeyboardEngine,
    word: *const c_char,
) -> *mut c_char {
    let word = str_arg(word).unwrap_or("");
    respond(engine, "lookup", |e| e.lookup(word))
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_suggest_prefix(
    engine: *const KeyboardEngine,
    prefix: *const c_char,
    limit: u32,
) -> *mut c_char {
    let prefix = str_arg(prefix).unwrap_or("");
    respond(engine, "suggest_prefix", |e| {
        e.suggest_prefix(prefix, limit as usize)
    })
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_correct(
    engine: *const KeyboardEngine,
    word: *const c_char,
    max_distance: u32,
) -> *mut c_char {
    let word = str_arg(word).unwrap_or("");
    respond(engine, "correct", |e| {
        e.correct(word, max_distance as usize, Verbosity::Closest)
    })
}

/// `xy` holds `point_count` interleaved x/y pairs. `preceding` is a space-separated
/// list of the words before the cursor and may be null.
///
/// # Safety
/// `xy` must point at `2 * point_count` doubles; other pointers as above.
#[no_mangle]
pub unsafe extern "C" fn kbd_rank_swipe(
    engine: *const KeyboardEngine,
    xy: *const f64,
    point_count: usize,
    preceding: *const c_char,
) -> *mut c_char {
    let points = points_arg(xy, point_count);
    let preceding = words(str_arg(preceding));
    respond(engine, "rank_swipe", |e| e.rank_swipe(&points, &preceding))
}

/// Raw decoder output, before frequency and context fusion.
///
/// # Safety
/// `xy` must point at `2 * point_count` doubles.
#[no_mangle]
pub unsafe extern "C" fn kbd_decode_swipe(
    engine: *const KeyboardEngine,
    xy: *const f64,
    point_count: usize,
) -> *mut c_char {
    let points = points_arg(xy, point_count);
    respond(engine, "decode_swipe", |e| e.decode_swipe(&points))
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_score_swipe_candidate(
    engine: *const KeyboardEngine,
    word: *const c_char,
    spatial_score: f64,
    preceding: *const c_char,
) -> *mut c_char {
    let word = str_arg(word).unwrap_or("");
    let preceding = words(str_arg(preceding));
    respond(engine, "score_swipe_candidate", |e| {
        e.score_swipe_candidate(word, spatial_score, &preceding)
    })
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_autocorrect(
    engine: *const KeyboardEngine,
    word: *const c_char,
    preceding: *const c_char,
) -> *mut c_char {
    let word = str_arg(word).unwrap_or("");
    let preceding = words(str_arg(preceding));
    respond(engine, "autocorrect", |e| e.autocorrect(word, &preceding))
}

/// # Safety
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn kbd_record_keystroke(engine: *const KeyboardEngine, at_ms: u64) {
    if let Some(engine) = engine.as_ref() {
        let _ = catch_unwind(AssertUnwindSafe(|| engine.record_keystroke(at_ms)));
    }
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_commit_word(engine: *const KeyboardEngine, word: *const c_char) {
    if let (Some(engine), Some(word)) = (engine.as_ref(), str_arg(word)) {
        let _ = catch_unwind(AssertUnwindSafe(|| engine.commit_word(word)));
    }
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_correction_accepted(
    engine: *const KeyboardEngine,
    original: *const c_char,
    accepted: *const c_char,
) -> *mut c_char {
    let original = str_arg(original).unwrap_or("");
    let accepted = str_arg(accepted).unwrap_or("");
    respond(engine, "correction_accepted", |e| {
        Ok(e.on_correction_accepted(original, accepted))
    })
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_correction_rejected(
    engine: *const KeyboardEngine,
    original: *const c_char,
    corrected: *const c_char,
) -> *mut c_char {
    let original = str_arg(original).unwrap_or("");
    let corrected = str_arg(corrected).unwrap_or("");
    respond(engine, "correction_rejected", |e| {
        Ok(e.on_correction_rejected(original, corrected))
    })
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_save_user_state(
    engine: *const KeyboardEngine,
    path: *const c_char,
) -> *mut c_char {
    let path = str_arg(path).unwrap_or("");
    respond(engine, "save_user_state", |e| e.save_user_state(Path::new(path)))
}

/// # Safety
/// Pointer arguments must be valid for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn kbd_load_user_state(
    engine: *const KeyboardEngine,
    path: *const c_char,
) -> *mut c_char {
    let path = str_arg(path).unwrap_or("");
    respond(engine, "load_user_state", |e| e.load_user_state(Path::new(path)))
}

/// # Safety
/// `s` must be null or a string returned by this library, freed at most once.
#[no_mangle]
pub unsafe extern "C" fn kbd_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    unsafe fn take(raw: *mut c_char) -> Value {
        let json = CStr::from_ptr(raw).to_str().unwrap().to_string();
        kbd_string_free(raw);
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn bad_config_yields_null_handle() {
        let config = CString::new("{ not json").unwrap();
        let handle = unsafe { kbd_engine_new(config.as_ptr()) };
        assert!(handle.is_null());
    }

    #[test]
    fn missing_dictionary_is_reported_as_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = CString::new(
            serde_json::json!({ "dictionary_dir": dir.path(), "language": "xx" }).to_string(),
        )
        .unwrap();
        unsafe {
            let handle = kbd_engine_new(config.as_ptr());
            assert!(!handle.is_null());

            let prefix = CString::new("th").unwrap();
            let value = take(kbd_suggest_prefix(handle, prefix.as_ptr(), 5));
            assert!(value["error"].as_str().unwrap().contains("xx"));

            let original = CString::new("teh").unwrap();
            let accepted = CString::new("the").unwrap();
            let value = take(kbd_correction_accepted(handle, original.as_ptr(), accepted.as_ptr()));
            assert_eq!(value["outcome"], "counted");
            assert_eq!(value["detail"], 1);

            kbd_engine_free(handle);
        }
    }

    #[test]
    fn lookup_and_swipe_through_the_handle() {
        use crate::core::builder::TrieBuilder;
        use crate::core::layout::KeyLayout;
        use crate::core::trie::NodeLayout;

        let dir = tempfile::tempdir().unwrap();
        let mut builder = TrieBuilder::new();
        for (word, frequency) in [("the", 255), ("tie", 40), ("tea", 30)] {
            builder.insert(word, frequency);
        }
        builder
            .write_to(&dir.path().join("en.bin"), NodeLayout::Packed)
            .unwrap();
        let config = CString::new(
            serde_json::json!({ "dictionary_dir": dir.path(), "language": "en" }).to_string(),
        )
        .unwrap();
        let xy: Vec<f64> = KeyLayout::qwerty()
            .trace("the")
            .iter()
            .flat_map(|p| [p.x, p.y])
            .collect();

        unsafe {
            let handle = kbd_engine_new(config.as_ptr());
            let word = CString::new("tie").unwrap();
            assert_eq!(take(kbd_lookup(handle, word.as_ptr())), 40);

            let decoded = take(kbd_decode_swipe(handle, xy.as_ptr(), 3));
            assert_eq!(decoded[0]["word"], "the");

            let word = CString::new("the").unwrap();
            let score = take(kbd_score_swipe_candidate(handle, word.as_ptr(), -1.0, ptr::null()));
            let expected = 0.5 * -1.0 + 0.3 * 255f64.ln();
            assert!((score.as_f64().unwrap() - expected).abs() < 1e-9);

            kbd_engine_free(handle);
        }
    }

    #[test]
    fn null_handle_is_an_error_not_a_crash() {
        let value = unsafe { take(kbd_autocorrect(ptr::null(), ptr::null(), ptr::null())) };
        assert_eq!(value["error"], "null engine handle");
    }
}
