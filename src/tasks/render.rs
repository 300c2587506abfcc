use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{RenderRequest, RenderedFrame};
use crate::pipeline::FilterPipeline;

/// Runs renders off the async runtime, one at a time.
///
/// While a render is in flight, newer requests replace each other in a single
/// pending slot. A finished render waits in a ready slot until `results` has
/// capacity; a newer request arriving first makes it stale and it is dropped.
/// Requests keep being accepted while delivery is blocked, so the sender never
/// waits on this task.
pub async fn run(
    mut requests: Receiver<RenderRequest>,
    results: Sender<RenderedFrame>,
    cancel: CancellationToken,
    pipeline: FilterPipeline,
) -> Result<()> {
    let mut in_flight: JoinSet<RenderedFrame> = JoinSet::new();
    let mut pending: Option<RenderRequest> = None;
    let mut ready: Option<RenderedFrame> = None;
    let mut latest: u64 = 0;
    let mut requests_open = true;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            maybe_request = requests.recv(), if requests_open => {
                match maybe_request {
                    Some(request) => {
                        latest = latest.max(request.generation);
                        if let Some(stale) = ready.take_if(|frame| frame.generation < latest) {
                            debug!(generation = stale.generation, "dropping undelivered render");
                        }
                        if in_flight.is_empty() {
                            start(&mut in_flight, request, pipeline);
                        } else if let Some(superseded) = pending.replace(request) {
                            debug!(generation = superseded.generation, "render request superseded");
                        }
                    }
                    None => requests_open = false,
                }
            }

            Some(joined) = in_flight.join_next() => {
                match joined {
                    Ok(frame) if frame.generation >= latest => {
                        debug!(generation = frame.generation, "render complete");
                        ready = Some(frame);
                    }
                    Ok(frame) => {
                        debug!(generation = frame.generation, latest, "dropping stale render");
                    }
                    Err(err) => warn!("render task failed: {err}"),
                }
                if let Some(next) = pending.take() {
                    start(&mut in_flight, next, pipeline);
                }
            }

            permit = results.reserve(), if ready.is_some() => {
                let Ok(permit) = permit else {
                    break;
                };
                if let Some(frame) = ready.take() {
                    permit.send(frame);
                }
            }

            else => break,
        }

        if !requests_open && in_flight.is_empty() && pending.is_none() && ready.is_none() {
            break;
        }
    }

    in_flight.abort_all();
    Ok(())
}

fn start(in_flight: &mut JoinSet<RenderedFrame>, request: RenderRequest, pipeline: FilterPipeline) {
    debug!(generation = request.generation, "starting render");
    in_flight.spawn_blocking(move || request.execute(&pipeline));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PixelBuffer;
    use crate::config::FilterParameters;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn request(generation: u64, invert: f32) -> RenderRequest {
        RenderRequest {
            generation,
            source: Arc::new(PixelBuffer::from_pixel(4, 4, [0, 0, 0, 255]).unwrap()),
            params: FilterParameters {
                invert,
                ..FilterParameters::default()
            },
        }
    }

    #[tokio::test]
    async fn queued_requests_collapse_to_latest() {
        let (tx_req, rx_req) = mpsc::channel(8);
        let (tx_out, mut rx_out) = mpsc::channel(8);
        for (generation, invert) in [(1, 0.0), (2, 50.0), (3, 100.0)] {
            tx_req.send(request(generation, invert)).await.unwrap();
        }
        drop(tx_req);

        run(rx_req, tx_out, CancellationToken::new(), FilterPipeline::default())
            .await
            .unwrap();

        let mut frames = Vec::new();
        while let Ok(frame) = rx_out.try_recv() {
            frames.push(frame);
        }
        let last = frames.last().unwrap();
        assert_eq!(last.generation, 3);
        assert_eq!(last.buffer.pixel(0, 0), Some([255, 255, 255, 255]));
        assert!(frames.windows(2).all(|w| w[0].generation < w[1].generation));
    }

    #[tokio::test]
    async fn exits_on_cancel() {
        let (_tx_req, rx_req) = mpsc::channel::<RenderRequest>(1);
        let (tx_out, _rx_out) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run(rx_req, tx_out, cancel, FilterPipeline::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn keeps_accepting_requests_while_results_are_full() {
        let (tx_req, rx_req) = mpsc::channel(1);
        let (tx_out, mut rx_out) = mpsc::channel(1);
        let worker = tokio::spawn(run(
            rx_req,
            tx_out,
            CancellationToken::new(),
            FilterPipeline::default(),
        ));

        // Nobody reads results here; every send must still go through.
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            for generation in 1..=200 {
                let invert = if generation == 200 { 100.0 } else { 0.0 };
                tx_req.send(request(generation, invert)).await.unwrap();
            }
        })
        .await
        .expect("request sender blocked on an undrained result channel");
        drop(tx_req);

        let mut last = None;
        while let Some(frame) = rx_out.recv().await {
            last = Some(frame);
        }
        let last = last.unwrap();
        assert_eq!(last.generation, 200);
        assert_eq!(last.buffer.pixel(0, 0), Some([255, 255, 255, 255]));
        worker.await.unwrap().unwrap();
    }
}
