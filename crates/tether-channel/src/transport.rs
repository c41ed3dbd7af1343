//! `WebSocket` connector over `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use tether_core::socket::NO_STATUS_RECEIVED;
use tether_core::{Connector, Socket, SocketEvent, SocketWrite, TransportError};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

/// Production [`Connector`]: one `WebSocket` handshake per call.
///
/// Text messages map to [`SocketEvent::Text`]; ping, pong and binary
/// messages are handled by tungstenite or skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Socket, TransportError> {
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(TransportError::connect)?;
        let (writer, reader) = ws.split();

        let sink = writer
            .sink_map_err(TransportError::socket)
            .with(|write: SocketWrite| future::ready(Ok::<_, TransportError>(to_message(write))));
        let stream = reader.filter_map(|msg| future::ready(from_message(msg)));

        Ok(Socket::new(Box::pin(sink), Box::pin(stream)))
    }
}

fn to_message(write: SocketWrite) -> Message {
    match write {
        SocketWrite::Text(text) => Message::Text(text.into()),
        SocketWrite::Close(code) => Message::Close(Some(CloseFrame {
            code: code.into(),
            reason: "closing".into(),
        })),
    }
}

fn from_message(
    msg: Result<Message, tungstenite::Error>,
) -> Option<Result<SocketEvent, TransportError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(SocketEvent::Text(text.as_str().to_owned()))),
        Ok(Message::Close(frame)) => {
            let code = frame.as_ref().map_or(NO_STATUS_RECEIVED, |f| f.code.into());
            Some(Ok(SocketEvent::Closed { code }))
        },
        // Ping/pong handled by tungstenite; binary skipped.
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_)) => None,
        Err(err) => Some(Err(TransportError::socket(err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn text_maps_both_ways() {
        assert_eq!(
            to_message(SocketWrite::Text("hi".into())),
            Message::Text("hi".into())
        );
        assert_eq!(
            from_message(Ok(Message::Text("hi".into()))).unwrap().unwrap(),
            SocketEvent::Text("hi".into())
        );
    }

    #[test]
    fn close_without_status_is_not_normal() {
        assert_eq!(
            from_message(Ok(Message::Close(None))).unwrap().unwrap(),
            SocketEvent::Closed { code: 1005 }
        );
    }

    #[test]
    fn close_code_is_preserved() {
        let frame = CloseFrame {
            code: CloseCode::from(4001),
            reason: "bye".into(),
        };
        assert_eq!(
            from_message(Ok(Message::Close(Some(frame)))).unwrap().unwrap(),
            SocketEvent::Closed { code: 4001 }
        );
    }

    #[test]
    fn control_messages_are_skipped() {
        assert!(from_message(Ok(Message::Ping(Vec::new().into()))).is_none());
        assert!(from_message(Ok(Message::Binary(vec![1, 2].into()))).is_none());
    }

    #[test]
    fn outbound_close_carries_code() {
        let Message::Close(Some(frame)) = to_message(SocketWrite::Close(1000)) else {
            panic!("expected close frame");
        };
        assert_eq!(u16::from(frame.code), 1000);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connect_error() {
        let url = Url::parse("ws://127.0.0.1:1/ws").unwrap();
        let err = WsConnector.connect(&url).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }
}
