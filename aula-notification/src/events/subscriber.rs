use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use aula_shared::clients::rabbitmq::RabbitMQClient;
use aula_shared::types::event::{payloads, routing_keys, Event};

use crate::models::NewNotification;
use crate::services::NotificationService;

/// Listen for course content events (assignment.posted,
/// announcement.published) and fan them out to the listed recipients.
pub async fn listen_course_events(
    rabbitmq: RabbitMQClient,
    service: NotificationService,
) -> anyhow::Result<()> {
    let mut consumer = rabbitmq
        .subscribe(
            "aula-notification.course",
            &[
                routing_keys::COURSE_ASSIGNMENT_POSTED,
                routing_keys::COURSE_ANNOUNCEMENT_PUBLISHED,
            ],
        )
        .await?;

    tracing::info!("listening for course events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                let routing_key = delivery.routing_key.to_string();

                if routing_key == routing_keys::COURSE_ASSIGNMENT_POSTED {
                    match serde_json::from_slice::<Event<payloads::AssignmentPosted>>(&delivery.data)
                    {
                        Ok(event) => {
                            let data = &event.data;
                            tracing::info!(
                                assignment_id = %data.assignment_id,
                                class_id = %data.class_id,
                                recipients = data.recipient_ids.len(),
                                "received assignment.posted event"
                            );

                            for recipient_id in &data.recipient_ids {
                                service.create(
                                    *recipient_id,
                                    NewNotification::new(
                                        "assignment",
                                        "New assignment",
                                        format!("{}: {}", data.class_name, data.title),
                                    )
                                    .with_payload(serde_json::json!({
                                        "assignment_id": data.assignment_id,
                                        "class_id": data.class_id,
                                        "due_at": data.due_at,
                                    })),
                                );
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to deserialize assignment.posted event");
                        }
                    }
                } else if routing_key == routing_keys::COURSE_ANNOUNCEMENT_PUBLISHED {
                    match serde_json::from_slice::<Event<payloads::AnnouncementPublished>>(
                        &delivery.data,
                    ) {
                        Ok(event) => {
                            let data = &event.data;
                            tracing::info!(
                                announcement_id = %data.announcement_id,
                                class_id = %data.class_id,
                                recipients = data.recipient_ids.len(),
                                "received announcement.published event"
                            );

                            for recipient_id in &data.recipient_ids {
                                service.create(
                                    *recipient_id,
                                    NewNotification::new(
                                        "announcement",
                                        format!("{}: {}", data.class_name, data.title),
                                        data.preview.clone(),
                                    )
                                    .with_payload(serde_json::json!({
                                        "announcement_id": data.announcement_id,
                                        "class_id": data.class_id,
                                    })),
                                );
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to deserialize announcement.published event");
                        }
                    }
                }

                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "course consumer error");
            }
        }
    }

    Ok(())
}

/// Listen for grade events (grade.released).
pub async fn listen_grade_events(
    rabbitmq: RabbitMQClient,
    service: NotificationService,
) -> anyhow::Result<()> {
    let mut consumer = rabbitmq
        .subscribe(
            "aula-notification.grade",
            &[routing_keys::COURSE_GRADE_RELEASED],
        )
        .await?;

    tracing::info!("listening for grade events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<payloads::GradeReleased>>(&delivery.data) {
                    Ok(event) => {
                        let data = &event.data;
                        tracing::info!(
                            assignment_id = %data.assignment_id,
                            student_id = %data.student_id,
                            "received grade.released event"
                        );

                        service.create(
                            data.student_id,
                            NewNotification::new(
                                "grade",
                                "Grade released",
                                format!("Your grade for {} is available", data.assignment_title),
                            )
                            .with_payload(serde_json::json!({
                                "assignment_id": data.assignment_id,
                                "class_id": data.class_id,
                            })),
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize grade.released event");
                    }
                }

                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "grade consumer error");
            }
        }
    }

    Ok(())
}

/// Listen for system notices (notice.issued).
pub async fn listen_system_events(
    rabbitmq: RabbitMQClient,
    service: NotificationService,
) -> anyhow::Result<()> {
    let mut consumer = rabbitmq
        .subscribe(
            "aula-notification.system",
            &[routing_keys::SYSTEM_NOTICE_ISSUED],
        )
        .await?;

    tracing::info!("listening for system events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<payloads::SystemNotice>>(&delivery.data) {
                    Ok(event) => {
                        let data = &event.data;
                        tracing::info!(
                            recipient_id = %data.recipient_id,
                            "received notice.issued event"
                        );

                        service.create(
                            data.recipient_id,
                            NewNotification::new("system", data.subject.clone(), data.body.clone()),
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize notice.issued event");
                    }
                }

                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "system consumer error");
            }
        }
    }

    Ok(())
}
