use core::mem::MaybeUninit;
use core::ptr;

use log::LevelFilter;
use vc16::HostError;

use crate::{DiskStats, HostLogger, Runtime};

extern "C" {
    fn log_message(ptr: *const u8, len: usize);
}

fn send_to_host(message: &[u8]) {
    unsafe { log_message(message.as_ptr(), message.len()) };
}

static LOGGER: HostLogger = HostLogger::new(send_to_host, LevelFilter::Debug);

struct RuntimeData {
    runtime: Runtime,
}

static mut DATA: MaybeUninit<RuntimeData> = MaybeUninit::uninit();

#[no_mangle]
pub extern "C" fn initialize() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LOGGER.level());
    }
    unsafe {
        DATA = MaybeUninit::new(RuntimeData {
            runtime: Runtime::new(),
        });
    }
    log::info!("initialized");
}

/// Must only be called after `initialize`.
unsafe fn get_runtime_data() -> &'static mut RuntimeData {
    &mut *(*ptr::addr_of_mut!(DATA)).as_mut_ptr()
}

fn status(result: Result<(), HostError>) -> u32 {
    match result {
        Ok(()) => 0,
        Err(error) => {
            log::warn!("{}", error);
            error.code()
        }
    }
}

macro_rules! export {
    ($(fn $name:ident($($data:ident: &mut RuntimeData $(, $($args:tt)*)?)?) $(-> $ret:ty)? $body:block)*) => {
        $(const _: () = {
            #[no_mangle]
            pub extern "C" fn $name($($($($args)*)?)?) $(-> $ret)? {
                $(let $data = unsafe { get_runtime_data() };)?
                $body
            }
        };)*
    };
}

export! {
    fn run(data: &mut RuntimeData, cycles: u32) {
        data.runtime.run(cycles);
    }

    fn reset(data: &mut RuntimeData) {
        data.runtime.reset();
    }

    fn key_down(data: &mut RuntimeData, code: u32) -> u32 {
        status(data.runtime.key_down(code).map(drop))
    }

    fn key_up(data: &mut RuntimeData, code: u32) -> u32 {
        status(data.runtime.key_up(code).map(drop))
    }

    fn screen_buffer(data: &mut RuntimeData) -> *const u8 {
        data.runtime.screen_buffer()
    }

    fn screen_width() -> u32 {
        Runtime::screen_width()
    }

    fn screen_height() -> u32 {
        Runtime::screen_height()
    }

    fn palette_buffer(data: &mut RuntimeData) -> *const u8 {
        data.runtime.palette_buffer()
    }

    fn disk_buffer(data: &mut RuntimeData, index: u32) -> *mut u8 {
        data.runtime.disk_buffer(index).unwrap_or_else(|error| {
            log::warn!("{}", error);
            ptr::null_mut()
        })
    }

    fn insert_disk(data: &mut RuntimeData, index: u32) -> u32 {
        status(data.runtime.insert_disk(index))
    }

    fn insert_read_only_disk(data: &mut RuntimeData, index: u32) -> u32 {
        status(data.runtime.insert_read_only_disk(index))
    }

    fn remove_disk(data: &mut RuntimeData, index: u32) -> u32 {
        status(data.runtime.remove_disk(index))
    }

    fn disk_stats(data: &mut RuntimeData, index: u32) -> u32 {
        match data.runtime.disk_stats(index) {
            Ok(stats) => stats.as_bits(),
            Err(_) => DiskStats::INVALID,
        }
    }

    fn activity_threshold(data: &mut RuntimeData) -> u32 {
        data.runtime.activity_threshold()
    }

    fn is_running(data: &mut RuntimeData) -> bool {
        data.runtime.is_running()
    }
}
