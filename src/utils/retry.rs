use std::future::Future;
use std::time::Duration;

/// Runs `op` up to `max_attempts` times, sleeping `backoff(attempt, &err)`
/// between failed attempts. Attempts are numbered from zero and there is no
/// sleep after the final failure.
pub async fn retry_with_backoff<T, E, F, Fut, B>(
    max_attempts: u32,
    backoff: B,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: Fn(u32, &E) -> Duration,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt + 1 >= max_attempts {
                    return Err(err);
                }
                let delay = backoff(attempt, &err);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
