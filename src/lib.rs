use std;
use std::cell::RefCell;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::oneshot::Sender;

pub mod dat;
pub mod http;
pub mod world;

pub use dat::*;
pub use world::WorldArchive;


struct ServerControl {
    stop_signal: Sender<()>,
    handle: JoinHandle<()>,
}


thread_local! {
    static SERVER_CONTROL: RefCell<Option<ServerControl>> = RefCell::new(None);
}


/// content key of the table of contents of `world`
#[no_mangle]
pub extern "C" fn eso_world_toc_key(world: u32) -> u64 {
    ContentKey::world_toc(world).0
}


/// content key of a world cell, fields wider than their slots are masked
#[no_mangle]
pub extern "C" fn eso_world_cell_key(world: u32, layer: u32, x: u32, y: u32) -> u64 {
    ContentKey::world_cell(world, layer, x, y).0
}


/// serves the current directory on 127.0.0.1:3000, returns false if already running
#[no_mangle]
pub extern "C" fn start_world_server() -> bool {
    log::info!("start world server");
    SERVER_CONTROL.with(|control| {
        if control.borrow().is_some() {
            return false;
        }

        let archive = Arc::new(WorldArchive::new(Path::new("."), DecodeLimits::default()));
        control.replace(Some(run_service(archive, ([127, 0, 0, 1], 3000).into())));

        true
    })
}


#[no_mangle]
pub extern "C" fn stop_world_server() -> bool {
    log::info!("stop world server");
    SERVER_CONTROL.with(|control| {
        let control = control.replace(None);
        match control {
            None => false,
            Some(control) => {
                // the server may already be gone, e.g. when binding failed
                let _ = control.stop_signal.send(());
                control.handle.join().is_ok()
            }
        }
    })
}


fn run_service(archive: Arc<WorldArchive>, addr: SocketAddr) -> ServerControl {
    let (http_stop_tx, http_stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = std::thread::spawn(move || {
        http::http_server_service(archive, addr, http_stop_rx);
    });

    ServerControl{
        stop_signal: http_stop_tx,
        handle,
    }
}
