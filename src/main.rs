//! Demo executable: set up a compute context and run both sample flows.

use gpu_fft_driver::scenario::{run_convolution, run_roundtrip};
use gpu_fft_driver::GpuContext;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let ctx = pollster::block_on(GpuContext::headless())?;
    let info = ctx.adapter_info();
    println!("GPU FFT driver sample on '{}' ({:?})", info.name, info.backend);

    println!("\n-- Round trip (forward + inverse) --");
    run_roundtrip(&ctx)?;

    println!("\n-- Transform-based convolution --");
    run_convolution(&ctx)?;

    Ok(())
}
