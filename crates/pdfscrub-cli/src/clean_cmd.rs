use pdfscrub::FilterPageOptions;

use crate::cli::CommonArgs;
use crate::shared::scrub;

pub fn run(common: &CommonArgs) -> Result<(), i32> {
    let mut options = FilterPageOptions::new();
    if common.keep_resources {
        options = options.keep_resources();
    }
    scrub(common, &mut options)
}
