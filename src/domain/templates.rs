//! Customer and admin wording for payment notifications.

use {
    super::id::NotificationGroupId,
    super::notification::{NewEmailRequest, NotificationKind, NotificationMessage},
    super::payment::{PaymentRecord, PaymentStatus},
    super::transition::UserNotice,
};

fn amount_text(record: &PaymentRecord) -> String {
    record
        .amount
        .map(|a| a.to_brl())
        .unwrap_or_else(|| "valor não informado".to_string())
}

fn method_text(record: &PaymentRecord) -> &str {
    match record.payment_method.as_deref() {
        Some("pix") => "PIX",
        Some("bolbradesco") | Some("boleto") => "boleto",
        Some(other) => other,
        None => "não informado",
    }
}

fn base_message(
    kind: NotificationKind,
    title: &str,
    body: String,
    record: &PaymentRecord,
    group: NotificationGroupId,
) -> NotificationMessage {
    NotificationMessage::new(kind, title, body)
        .with_data("paymentId", record.payment_id.as_str())
        .with_data("status", record.status.as_str())
        .with_group(group)
}

pub fn user_message(
    notice: UserNotice,
    record: &PaymentRecord,
    group: NotificationGroupId,
) -> NotificationMessage {
    let amount = amount_text(record);
    let (title, body) = match notice {
        UserNotice::Approved => (
            "Pagamento Recebido",
            format!("Recebemos seu pagamento de {amount}. Obrigado!"),
        ),
        UserNotice::Rejected => (
            "Pagamento Recusado",
            format!(
                "Seu pagamento de {amount} não foi aprovado. Tente novamente ou use outro meio de pagamento."
            ),
        ),
        UserNotice::Pending => (
            "Pagamento Pendente",
            format!("Seu pagamento de {amount} ainda está pendente. Conclua-o para garantir sua moto."),
        ),
    };
    base_message(notice.kind(), title, body, record, group)
}

pub fn user_email(notice: UserNotice, record: &PaymentRecord, to: &str) -> NewEmailRequest {
    let amount = amount_text(record);
    let method = method_text(record);
    let (subject, headline, paragraph) = match notice {
        UserNotice::Approved => (
            "Pagamento Recebido",
            "Pagamento confirmado",
            format!("Recebemos seu pagamento de <strong>{amount}</strong> via {method}."),
        ),
        UserNotice::Rejected => (
            "Pagamento Recusado",
            "Pagamento não aprovado",
            format!(
                "Seu pagamento de <strong>{amount}</strong> via {method} foi recusado. Você pode tentar novamente pelo aplicativo."
            ),
        ),
        UserNotice::Pending => (
            "Pagamento Pendente",
            "Pagamento aguardando confirmação",
            format!(
                "Seu pagamento de <strong>{amount}</strong> via {method} ainda não foi confirmado. Caso já tenha pago, desconsidere este aviso."
            ),
        ),
    };
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">{headline}</h2>
<p>{paragraph}</p>
<p style="color: #666; font-size: 14px;">Código do pagamento: {payment_id}</p>
</body>
</html>"#,
        payment_id = record.payment_id,
    );
    NewEmailRequest {
        to: to.to_string(),
        subject: subject.to_string(),
        html,
        attachments: Vec::new(),
    }
}

pub fn admin_status_change(
    record: &PaymentRecord,
    previous: Option<&PaymentStatus>,
    group: NotificationGroupId,
) -> NotificationMessage {
    let from = previous.map(|p| p.label()).unwrap_or("Novo");
    let who = record
        .user_email
        .as_deref()
        .or(record.payer_email.as_deref())
        .unwrap_or("usuário não identificado");
    let body = format!(
        "Pagamento {} ({}) de {}: {} → {}",
        record.payment_id,
        amount_text(record),
        who,
        from,
        record.status.label(),
    );
    base_message(
        NotificationKind::AdminPaymentStatus,
        "Status de pagamento atualizado",
        body,
        record,
        group,
    )
    .with_data("previousStatus", previous.map(|p| p.as_str()).unwrap_or("new"))
}

pub fn admin_no_user(record: &PaymentRecord, group: NotificationGroupId) -> NotificationMessage {
    let body = format!(
        "Pagamento {} ({}, {}) não pôde ser associado a nenhum usuário. Referência: {}",
        record.payment_id,
        amount_text(record),
        record.status.label(),
        record.external_reference.as_deref().unwrap_or("nenhuma"),
    );
    base_message(
        NotificationKind::AdminPaymentNoUser,
        "Pagamento sem usuário identificado",
        body,
        record,
        group,
    )
}

pub fn verification_code_email(to: &str, code: &str, ttl_minutes: i64) -> NewEmailRequest {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Seu código de verificação</h2>
<div style="background: #f5f5f5; padding: 20px; border-radius: 8px; text-align: center;">
<code style="font-size: 24px; font-weight: bold; letter-spacing: 4px; color: #333;">{code}</code>
</div>
<p style="color: #666;">O código expira em {ttl_minutes} minutos.</p>
</body>
</html>"#
    );
    NewEmailRequest {
        to: to.to_string(),
        subject: "Código de verificação".to_string(),
        html,
        attachments: Vec::new(),
    }
}
