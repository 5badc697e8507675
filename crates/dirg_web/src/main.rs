// Binary Trunk loads from index.html. Mounts the grid page and starts syncing.

fn main() {}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn wasm_start() {
    dirg_web::start();
}
