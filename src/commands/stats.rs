use super::Context;
use anyhow::Result;

pub fn run(ctx: &Context, reset: bool) -> Result<()> {
    if reset {
        ctx.with_counter(|counter| counter.reset());
        println!("Operation counter reset");
    } else {
        println!("Total operations: {}", ctx.with_counter(|counter| counter.get()));
    }
    Ok(())
}
