//! Requests are the unit of work sent across threads. Tasks are what they look like once they're in a queue.

/// A single piece of work to be done against a `T` living on some other thread.
///
/// Requests are posted through a [`RequestSender`](crate::RequestSender), travel through that receiver's
/// dispatcher queue, and eventually [`handle`](Self::handle) is called exactly once on the receiver's thread -- or
/// never, if the receiver is gone by the time the request gets there. Either way the request is then dropped, on
/// whatever thread it happens to be on.
///
/// Failures the target runs into should be recorded in the request itself (e.g. an `Option<Result<..>>` field the
/// caller reads afterwards), not by panicking: a panic on a [`RequestThread`](crate::RequestThread) ends the process.
///
/// Because `FnMut(&mut T) + Send` implements `Request<T>`, you can usually skip the struct and post a closure.
pub trait Request<T>: Send {
    fn handle(&mut self, target: &mut T);
}

impl<T, F: FnMut(&mut T) + Send> Request<T> for F {
    fn handle(&mut self, target: &mut T) {
        self(target)
    }
}

/// A type-erased unit of work, ready to run on a dispatcher's thread.
///
/// Dropping a task without running it is always allowed, and is how shutdown discards queued work.
pub type Task = Box<dyn FnOnce() + Send>;

#[cfg(test)]
mod test {
    use super::*;

    struct Double;

    impl Request<Vec<u32>> for Double {
        fn handle(&mut self, target: &mut Vec<u32>) {
            target.iter_mut().for_each(|v| *v *= 2);
        }
    }

    fn run<T>(mut req: impl Request<T>, target: &mut T) {
        req.handle(target)
    }

    #[test]
    fn structs_handle() {
        let mut v = vec![1, 2, 3];
        run(Double, &mut v);
        assert_eq!(v, vec![2, 4, 6]);
    }

    #[test]
    fn closures_handle() {
        let mut v = vec![1];
        let mut seen = 0;
        run(
            |t: &mut Vec<u32>| {
                seen = t.len();
                t.push(5);
            },
            &mut v,
        );
        assert_eq!(v, vec![1, 5]);
        assert_eq!(seen, 1);
    }
}
