/*!
    Custom AVIO context that lets the demuxer pull from a [`DataSource`].
*/

use std::ffi::{c_int, c_void};
use std::io::{ErrorKind, SeekFrom};
use std::ptr;

use ffmpeg_next::{ffi, format::context::Input as InputContext};

use ffmpeg_types::{Error, Result};

use crate::data_source::DataSource;

const BUFFER_SIZE: usize = 64 * 1024;

const SEEK_SET: c_int = 0;
const SEEK_CUR: c_int = 1;
const SEEK_END: c_int = 2;

/**
    Owns the AVIO context and the boxed source its callbacks point at.

    Must outlive the input context that reads through it.
*/
pub(crate) struct CustomIo {
    avio: *mut ffi::AVIOContext,
    opaque: *mut Box<dyn DataSource>,
}

impl CustomIo {
    fn new(source: Box<dyn DataSource>) -> Result<Self> {
        let seekable = source.is_seekable();

        // SAFETY: the buffer and the opaque box are handed to the AVIO
        // context, and `Drop` releases all three together.
        unsafe {
            let buffer = ffi::av_malloc(BUFFER_SIZE) as *mut u8;
            if buffer.is_null() {
                return Err(Error::codec("failed to allocate AVIO buffer"));
            }

            let opaque = Box::into_raw(Box::new(source));
            let avio = ffi::avio_alloc_context(
                buffer,
                BUFFER_SIZE as c_int,
                0,
                opaque as *mut c_void,
                Some(read_packet),
                None,
                if seekable { Some(seek) } else { None },
            );

            if avio.is_null() {
                ffi::av_free(buffer as *mut c_void);
                drop(Box::from_raw(opaque));
                return Err(Error::codec("failed to allocate AVIO context"));
            }

            Ok(Self { avio, opaque })
        }
    }
}

impl Drop for CustomIo {
    fn drop(&mut self) {
        // SAFETY: the input context using this AVIO has already been closed.
        // FFmpeg may have swapped the buffer, so free the one it holds now.
        unsafe {
            if !self.avio.is_null() {
                ffi::av_freep(ptr::addr_of_mut!((*self.avio).buffer) as *mut c_void);
                ffi::avio_context_free(&mut self.avio);
            }
            drop(Box::from_raw(self.opaque));
        }
    }
}

/**
    Open an input context that demuxes from `source`.

    Stream info is read before returning, so the context is ready for
    probing or packet reads.
*/
pub(crate) fn open_input(source: Box<dyn DataSource>) -> Result<(InputContext, CustomIo)> {
    ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;

    let io = CustomIo::new(source)?;

    // SAFETY: `ctx` is freed by avformat_open_input on failure and by
    // avformat_close_input (through `Input`'s Drop) afterwards. The custom
    // IO flag keeps FFmpeg from closing `io.avio` itself.
    unsafe {
        let mut ctx = ffi::avformat_alloc_context();
        if ctx.is_null() {
            return Err(Error::codec("failed to allocate format context"));
        }
        (*ctx).pb = io.avio;
        (*ctx).flags |= ffi::AVFMT_FLAG_CUSTOM_IO as c_int;

        let ret = ffi::avformat_open_input(&mut ctx, ptr::null(), ptr::null(), ptr::null_mut());
        if ret < 0 {
            return Err(Error::codec(format!(
                "failed to open data source: {}",
                ffmpeg_next::Error::from(ret)
            )));
        }

        let ret = ffi::avformat_find_stream_info(ctx, ptr::null_mut());
        if ret < 0 {
            ffi::avformat_close_input(&mut ctx);
            return Err(Error::codec(format!(
                "failed to read stream info: {}",
                ffmpeg_next::Error::from(ret)
            )));
        }

        Ok((InputContext::wrap(ctx), io))
    }
}

unsafe extern "C" fn read_packet(opaque: *mut c_void, buf: *mut u8, size: c_int) -> c_int {
    if size <= 0 {
        return 0;
    }

    // SAFETY: `opaque` is the box leaked in `CustomIo::new`, alive until drop.
    let source = unsafe { &mut *(opaque as *mut Box<dyn DataSource>) };
    let out = unsafe { std::slice::from_raw_parts_mut(buf, size as usize) };

    match source.read(out) {
        Ok(0) => ffi::AVERROR_EOF,
        Ok(count) => count as c_int,
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
            ffi::AVERROR(ffi::EAGAIN)
        }
        Err(e) => {
            tracing::warn!(error = %e, "data source read failed");
            ffi::AVERROR_EXTERNAL
        }
    }
}

unsafe extern "C" fn seek(opaque: *mut c_void, offset: i64, whence: c_int) -> i64 {
    // SAFETY: see `read_packet`.
    let source = unsafe { &mut *(opaque as *mut Box<dyn DataSource>) };
    let whence = whence & !(ffi::AVSEEK_FORCE as c_int);

    if whence == ffi::AVSEEK_SIZE as c_int {
        return source.len().map_or(-1, |len| len as i64);
    }

    let pos = match whence {
        SEEK_SET if offset >= 0 => SeekFrom::Start(offset as u64),
        SEEK_CUR => SeekFrom::Current(offset),
        SEEK_END => SeekFrom::End(offset),
        _ => return -1,
    };

    match source.seek(pos) {
        Ok(position) => position as i64,
        Err(e) => {
            tracing::debug!(error = %e, "data source seek failed");
            ffi::AVERROR_EXTERNAL as i64
        }
    }
}
