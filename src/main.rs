use pushpoll::error::AppResult;

fn main() -> AppResult<()> {
    pushpoll::entry::run()
}
