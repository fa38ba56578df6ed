use clap::Parser;

use crate::error::{AppError, AppResult};

use super::PushpollArgs;

pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<PushpollArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    PushpollArgs::try_parse_from(args).map_err(AppError::from)
}
