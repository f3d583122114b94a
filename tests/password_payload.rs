//! Checks that secret buffers are zero when they go back to the allocator.
//!
//! A watching global allocator copies the contents of one chosen block (by
//! address, or the next one of a given size) at the moment it is freed. Lives in its own test binary so the allocator
//! does not affect other suites.

use std::alloc::{GlobalAlloc, Layout, System};
use std::io::{self, Read};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use realm_command::exec::{CommandInvocation, ProcessRunner};
use realm_command::secret::{MAX_SECRET_LEN, PasswordPayload};
use realm_command_test_utils::{init_tracing, with_timeout};

const SNAPSHOT_CAP: usize = 64;

static WATCHED: AtomicUsize = AtomicUsize::new(0);
/// Alternatively watch the next freed block of this size.
static WATCHED_SIZE: AtomicUsize = AtomicUsize::new(0);
static CAPTURED: AtomicBool = AtomicBool::new(false);
static SNAPSHOT_LEN: AtomicUsize = AtomicUsize::new(0);
static SNAPSHOT: [AtomicU8; SNAPSHOT_CAP] = [const { AtomicU8::new(0) }; SNAPSHOT_CAP];

/// Tests share the watch slot.
static SERIAL: Mutex<()> = Mutex::new(());

struct WatchingAllocator;

unsafe impl GlobalAlloc for WatchingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let addr = ptr as usize;
        let by_addr = addr != 0
            && WATCHED
                .compare_exchange(addr, 0, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok();
        let by_size = !by_addr
            && layout.size() != 0
            && WATCHED_SIZE
                .compare_exchange(layout.size(), 0, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok();
        if by_addr || by_size {
            let len = layout.size().min(SNAPSHOT_CAP);
            for (i, slot) in SNAPSHOT.iter().enumerate().take(len) {
                slot.store(unsafe { *ptr.add(i) }, Ordering::SeqCst);
            }
            SNAPSHOT_LEN.store(len, Ordering::SeqCst);
            CAPTURED.store(true, Ordering::SeqCst);
        }
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: WatchingAllocator = WatchingAllocator;

fn watch(ptr: *const u8) {
    CAPTURED.store(false, Ordering::SeqCst);
    SNAPSHOT_LEN.store(0, Ordering::SeqCst);
    WATCHED_SIZE.store(0, Ordering::SeqCst);
    WATCHED.store(ptr as usize, Ordering::SeqCst);
}

fn watch_size(size: usize) {
    CAPTURED.store(false, Ordering::SeqCst);
    SNAPSHOT_LEN.store(0, Ordering::SeqCst);
    WATCHED.store(0, Ordering::SeqCst);
    WATCHED_SIZE.store(size, Ordering::SeqCst);
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Yields `data` one byte per call, then fails.
struct FailingReader<'a> {
    data: &'a [u8],
}

impl Read for FailingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.split_first() {
            Some((&b, rest)) if !buf.is_empty() => {
                buf[0] = b;
                self.data = rest;
                Ok(1)
            }
            _ => Err(io::Error::other("stdin went away")),
        }
    }
}

/// Contents of the watched block when it was freed, if it was.
fn freed_contents() -> Option<Vec<u8>> {
    if !CAPTURED.load(Ordering::SeqCst) {
        return None;
    }
    let len = SNAPSHOT_LEN.load(Ordering::SeqCst);
    Some(
        SNAPSHOT[..len]
            .iter()
            .map(|b| b.load(Ordering::SeqCst))
            .collect(),
    )
}

fn serial() -> std::sync::MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn watcher_sees_ordinary_buffers_unchanged() {
    let _guard = serial();

    let plain: Box<[u8]> = b"not a secret".to_vec().into_boxed_slice();
    watch(plain.as_ptr());
    drop(plain);

    assert_eq!(freed_contents().as_deref(), Some(&b"not a secret"[..]));
}

#[test]
fn payload_is_zeroed_on_drop() {
    let _guard = serial();

    let payload = PasswordPayload::build(b"hunter2");
    assert_eq!(payload.as_bytes_with_nul(), b"hunter2\n\0");
    watch(payload.as_bytes_with_nul().as_ptr());
    drop(payload);

    let freed = freed_contents().expect("payload buffer was not freed");
    assert_eq!(freed.len(), 9);
    assert!(freed.iter().all(|&b| b == 0), "left behind: {freed:?}");
}

#[test]
fn shared_payload_is_zeroed_after_last_clone() {
    let _guard = serial();

    let payload = PasswordPayload::build(b"correct horse");
    watch(payload.as_bytes_with_nul().as_ptr());

    let bytes = payload.into_bytes();
    assert_eq!(&bytes[..], b"correct horse\n");
    let clone = bytes.clone();

    drop(bytes);
    assert!(freed_contents().is_none());

    drop(clone);
    let freed = freed_contents().expect("payload buffer was not freed");
    assert!(freed.iter().all(|&b| b == 0), "left behind: {freed:?}");
}

#[tokio::test]
async fn payload_is_zeroed_after_the_child_consumed_it() {
    init_tracing();
    let _guard = serial();

    let payload = PasswordPayload::build(b"Adm1nistrat0r!");
    watch(payload.as_bytes_with_nul().as_ptr());

    let invocation = CommandInvocation::new(["/bin/sh", "-c", "read -r pw; printf ok"])
        .password(payload);
    let result = with_timeout(ProcessRunner::default().start(invocation)).await;

    assert_eq!(result.output, b"ok");
    let freed = freed_contents().expect("payload buffer was not freed");
    assert!(freed.iter().all(|&b| b == 0), "left behind: {freed:?}");
}

#[test]
fn line_reader_wipes_its_scratch_buffer() {
    let _guard = serial();

    watch_size(MAX_SECRET_LEN);
    let payload = PasswordPayload::read_line(&b"Sup3rS3cret!\nnext"[..]).unwrap();
    assert_eq!(payload.as_bytes(), b"Sup3rS3cret!\n");

    let freed = freed_contents().expect("scratch buffer was not freed");
    assert!(!contains(&freed, b"Sup3rS3cret!"), "left behind: {freed:?}");
}

#[test]
fn line_reader_wipes_its_scratch_buffer_on_error() {
    let _guard = serial();

    watch_size(MAX_SECRET_LEN);
    let err = PasswordPayload::read_line(FailingReader { data: b"Half3Secret" }).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::Other);

    let freed = freed_contents().expect("scratch buffer was not freed");
    assert!(!contains(&freed, b"Half3Secret"), "left behind: {freed:?}");
}
