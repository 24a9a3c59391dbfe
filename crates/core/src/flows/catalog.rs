//! Dialogue graphs of the scripted flows.

use crate::domain::ticket::TicketCategory;
use crate::flows::labels;
use crate::flows::nodes::{FlowDefinition, GraphError, Node, NodeEffect, NodeId, Target};
use crate::flows::states::Topic;

pub const TRACK_ORDER: &str = "Track Order";
pub const SERVICES: &str = "Services";
pub const FAQS: &str = "FAQs";
pub const SUBMIT_TICKET_MENU: &str = "Submit a Ticket";
pub const TRACK_TICKETS: &str = "Track Tickets";
pub const SUBMIT_TICKET: &str = "Submit Ticket";
pub const SHOW_TICKETS: &str = "Show My Tickets";
pub const THATS_ALL: &str = "That's all";

const END_PROMPT: &str = "Thank you for chatting with us! Tap End Chat whenever you're ready.";

/// Ticket category implied by the detail-collecting node a ticket is filed from.
pub fn ticket_category_for(node: NodeId) -> Option<TicketCategory> {
    match node {
        NodeId::TicketOrderIssue => Some(TicketCategory::OrderIssue),
        NodeId::TicketPaymentIssue => Some(TicketCategory::PaymentIssue),
        NodeId::TicketOther => Some(TicketCategory::Other),
        _ => None,
    }
}

pub fn static_definitions() -> Result<Vec<FlowDefinition>, GraphError> {
    Ok(vec![main_menu()?, tickets()?, ticket_tracking()?, faqs()?, services()?, payment_methods()?])
}

fn menu() -> Target {
    Target::Flow(Topic::MainMenu)
}

fn end_node() -> Node {
    Node::new(NodeId::End, END_PROMPT).option(labels::END_CHAT, Target::EndChat)
}

pub fn main_menu() -> Result<FlowDefinition, GraphError> {
    FlowDefinition::new(
        Topic::MainMenu,
        NodeId::MainMenu,
        vec![Node::new(NodeId::MainMenu, "Hi! How can we help you today?")
            .option(labels::PLACE_ORDER, Target::Flow(Topic::PlaceOrder))
            .option(TRACK_ORDER, Target::Flow(Topic::TrackOrder))
            .option(SERVICES, Target::Flow(Topic::ServiceInfo))
            .option(FAQS, Target::Flow(Topic::Faqs))
            .option(labels::PAYMENT_METHODS, Target::Flow(Topic::PaymentMethods))
            .option(SUBMIT_TICKET_MENU, Target::Flow(Topic::Tickets))
            .option(TRACK_TICKETS, Target::Flow(Topic::TicketTracking))
            .option(labels::END_CHAT, Target::EndChat)],
    )
}

pub fn tickets() -> Result<FlowDefinition, GraphError> {
    let detail = |id: NodeId, prompt: &str| {
        Node::new(id, prompt)
            .collects_details()
            .option(SUBMIT_TICKET, Target::Node(NodeId::TicketSubmitted))
            .option(labels::BACK, Target::Node(NodeId::TicketCategory))
    };

    FlowDefinition::new(
        Topic::Tickets,
        NodeId::TicketCategory,
        vec![
            Node::new(NodeId::TicketCategory, "What is your concern about?")
                .option(TicketCategory::OrderIssue.label(), Target::Node(NodeId::TicketOrderIssue))
                .option(TicketCategory::PaymentIssue.label(), Target::Node(NodeId::TicketPaymentIssue))
                .option(TicketCategory::Other.label(), Target::Node(NodeId::TicketOther))
                .option(labels::BACK_TO_MENU, menu()),
            detail(
                NodeId::TicketOrderIssue,
                "Please describe the problem with your order, then tap Submit Ticket.",
            ),
            detail(
                NodeId::TicketPaymentIssue,
                "Please describe the payment problem, including the reference number if you have one, then tap Submit Ticket.",
            ),
            detail(NodeId::TicketOther, "Tell us what's on your mind, then tap Submit Ticket."),
            Node::new(
                NodeId::TicketSubmitted,
                "Our support team will get back to you within one business day.",
            )
            .effect(NodeEffect::CreateTicket)
            .option(TRACK_TICKETS, Target::Flow(Topic::TicketTracking))
            .option(labels::BACK_TO_MENU, menu())
            .option(labels::END_CHAT, Target::Node(NodeId::End)),
            end_node(),
        ],
    )
}

pub fn ticket_tracking() -> Result<FlowDefinition, GraphError> {
    FlowDefinition::new(
        Topic::TicketTracking,
        NodeId::TicketTrackingStart,
        vec![
            Node::new(NodeId::TicketTrackingStart, "Would you like to see the tickets you've submitted?")
                .option(SHOW_TICKETS, Target::Node(NodeId::TicketList))
                .option(labels::BACK_TO_MENU, menu()),
            Node::new(NodeId::TicketList, "Is there anything else we can help with?")
                .effect(NodeEffect::ListTickets)
                .option(SUBMIT_TICKET_MENU, Target::Flow(Topic::Tickets))
                .option(labels::BACK_TO_MENU, menu())
                .option(labels::END_CHAT, Target::Node(NodeId::End)),
            end_node(),
        ],
    )
}

pub fn faqs() -> Result<FlowDefinition, GraphError> {
    let answer = |id: NodeId, text: &str| {
        Node::new(id, text)
            .option("More FAQs", Target::Node(NodeId::FaqMenu))
            .option(THATS_ALL, Target::Node(NodeId::End))
            .option(labels::BACK_TO_MENU, menu())
    };

    FlowDefinition::new(
        Topic::Faqs,
        NodeId::FaqMenu,
        vec![
            Node::new(NodeId::FaqMenu, "What would you like to know?")
                .option("How do I order?", Target::Node(NodeId::FaqOrdering))
                .option("Turnaround Times", Target::Node(NodeId::FaqTurnaround))
                .option("Delivery and Pickup", Target::Node(NodeId::FaqDelivery))
                .option(labels::BACK_TO_MENU, menu()),
            answer(
                NodeId::FaqOrdering,
                "Choose Place Order from the menu, pick your product, specification, size and quantity, then confirm. We'll send you a quote you can accept or negotiate.",
            ),
            answer(
                NodeId::FaqTurnaround,
                "Most print jobs are ready within 2 to 3 business days after payment. Large format and bulk orders may take up to a week.",
            ),
            answer(
                NodeId::FaqDelivery,
                "Orders are ready for pickup at our shop by default. Delivery within the city can be arranged once your quote is accepted.",
            ),
            end_node(),
        ],
    )
}

pub fn services() -> Result<FlowDefinition, GraphError> {
    let service = |id: NodeId, text: &str| {
        Node::new(id, text)
            .option(labels::PLACE_ORDER, Target::Flow(Topic::PlaceOrder))
            .option("More Services", Target::Node(NodeId::ServicesMenu))
            .option(THATS_ALL, Target::Node(NodeId::End))
    };

    FlowDefinition::new(
        Topic::ServiceInfo,
        NodeId::ServicesMenu,
        vec![
            Node::new(NodeId::ServicesMenu, "Which service would you like to know more about?")
                .option("Printing", Target::Node(NodeId::ServicePrinting))
                .option("Large Format", Target::Node(NodeId::ServiceLargeFormat))
                .option("Binding", Target::Node(NodeId::ServiceBinding))
                .option(labels::BACK_TO_MENU, menu()),
            service(
                NodeId::ServicePrinting,
                "We print business cards, flyers, brochures and posters in full color on matte or glossy stock.",
            ),
            service(
                NodeId::ServiceLargeFormat,
                "Tarpaulins, banners and signage printed up to 10 feet wide, indoor and outdoor grades.",
            ),
            service(
                NodeId::ServiceBinding,
                "Ring, perfect and hardcover binding for theses, manuals and photo books.",
            ),
            end_node(),
        ],
    )
}

pub fn payment_methods() -> Result<FlowDefinition, GraphError> {
    let method = |id: NodeId, text: &str| {
        Node::new(id, text)
            .option("Other Methods", Target::Node(NodeId::PaymentMenu))
            .option(TRACK_ORDER, Target::Flow(Topic::TrackOrder))
            .option(THATS_ALL, Target::Node(NodeId::End))
    };

    FlowDefinition::new(
        Topic::PaymentMethods,
        NodeId::PaymentMenu,
        vec![
            Node::new(NodeId::PaymentMenu, "How would you like to pay?")
                .option("GCash", Target::Node(NodeId::PaymentGcash))
                .option("Bank Transfer", Target::Node(NodeId::PaymentBank))
                .option("Cash on Pickup", Target::Node(NodeId::PaymentCash))
                .option(labels::BACK_TO_MENU, menu()),
            method(
                NodeId::PaymentGcash,
                "Send the quoted amount to our GCash account and upload the receipt from your order page.",
            ),
            method(
                NodeId::PaymentBank,
                "Transfer the quoted amount to our bank account and keep the deposit slip as proof of payment.",
            ),
            method(NodeId::PaymentCash, "Pay in cash at the counter when you pick up your order."),
            end_node(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::{static_definitions, ticket_category_for};
    use crate::domain::ticket::TicketCategory;
    use crate::flows::labels;
    use crate::flows::nodes::NodeId;
    use crate::flows::states::Topic;

    #[test]
    fn every_static_graph_validates() {
        let definitions = static_definitions().expect("graphs are well formed");
        let topics = definitions.iter().map(|definition| definition.topic()).collect::<Vec<_>>();
        assert!(topics.contains(&Topic::MainMenu));
        assert!(topics.contains(&Topic::Tickets));
        assert!(topics.contains(&Topic::PaymentMethods));
        assert!(!topics.contains(&Topic::PlaceOrder));
    }

    #[test]
    fn end_nodes_only_offer_end_chat() {
        for definition in static_definitions().expect("graphs") {
            if let Some(end) = definition.node(NodeId::End) {
                assert_eq!(end.labels(), vec![labels::END_CHAT.to_owned()]);
            }
        }
    }

    #[test]
    fn detail_nodes_map_to_ticket_categories() {
        assert_eq!(ticket_category_for(NodeId::TicketPaymentIssue), Some(TicketCategory::PaymentIssue));
        assert_eq!(ticket_category_for(NodeId::FaqMenu), None);
    }
}
